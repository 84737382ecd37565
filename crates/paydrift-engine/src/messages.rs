//! Notification message composition.
//!
//! Each builder returns `(subject, body)`. Bodies are plain text; the
//! relay behind the sink handles formatting and transport.

use paydrift_types::{ExternalTxId, ReviewStatus};
use rust_decimal::Decimal;

/// Deposit instructions sent right after intent creation.
///
/// The "send EXACTLY" line is load-bearing: the amount is the correlation
/// key, so a deposit off by a cent will not settle automatically.
#[must_use]
pub fn deposit_instructions(
    name: &str,
    coin: &str,
    network: &str,
    address: &str,
    amount: Decimal,
    ttl_mins: i64,
) -> (String, String) {
    let subject = "Deposit Request Created".to_string();
    let body = format!(
        "Dear {name},\n\n\
         Your deposit request has been created successfully.\n\n\
         Deposit Instructions:\n\
         - Coin: {coin}\n\
         - Network: {network}\n\
         - Address: {address}\n\
         - Exact Amount: {amount} {coin}\n\n\
         IMPORTANT: Please send EXACTLY {amount} {coin} to ensure automatic processing.\n\n\
         This deposit request will expire in {ttl_mins} minutes.\n"
    );
    (subject, body)
}

/// Confirmation sent to the user once their deposit settles.
#[must_use]
pub fn deposit_confirmed(
    name: &str,
    amount: Decimal,
    coin: &str,
    tx_id: &ExternalTxId,
) -> (String, String) {
    let subject = "Deposit Confirmed - Account Activated".to_string();
    let body = format!(
        "Dear {name},\n\n\
         Great news! Your deposit of {amount} {coin} has been confirmed.\n\n\
         Your account is now activated and you can start earning rewards!\n\n\
         Transaction ID: {tx_id}\n"
    );
    (subject, body)
}

/// Operator notice for an automatically settled deposit.
#[must_use]
pub fn deposit_confirmed_operator(
    name: &str,
    email: &str,
    amount: Decimal,
    coin: &str,
    tx_id: &ExternalTxId,
) -> (String, String) {
    let subject = "New Deposit Confirmed".to_string();
    let body = format!(
        "A new deposit has been confirmed and processed automatically.\n\n\
         User: {name}\n\
         Email: {email}\n\
         Amount: {amount} {coin}\n\
         Transaction ID: {tx_id}\n\n\
         The user has been marked as eligible.\n"
    );
    (subject, body)
}

/// Operator alert raised when the deposit-address lookup failed and the
/// static fallback address was handed out instead.
#[must_use]
pub fn address_fallback_operator(network: &str, address: &str) -> (String, String) {
    let subject = "Deposit Address Fallback In Use".to_string();
    let body = format!(
        "The exchange deposit-address lookup failed; the static fallback\n\
         address was sent to a user instead.\n\n\
         Network: {network}\n\
         Fallback address: {address}\n\n\
         If the exchange has rotated its deposit address, incoming deposits\n\
         may land on an address we are not watching. Verify the fallback is\n\
         still current.\n"
    );
    (subject, body)
}

/// Acknowledgement sent to the user after a withdrawal submission.
#[must_use]
pub fn withdrawal_submitted(name: &str, amount: Decimal, coin: &str) -> (String, String) {
    let subject = "Withdrawal Request Submitted".to_string();
    let body = format!(
        "Dear {name},\n\n\
         We have received your withdrawal request of {amount} {coin} and\n\
         submitted it for processing. You will be notified when it\n\
         completes.\n"
    );
    (subject, body)
}

/// Operator notice for a submitted withdrawal.
#[must_use]
pub fn withdrawal_submitted_operator(
    name: &str,
    email: &str,
    amount: Decimal,
    coin: &str,
) -> (String, String) {
    let subject = "New Withdrawal Request Submitted".to_string();
    let body = format!(
        "A new withdrawal request has been submitted.\n\n\
         User: {name}\n\
         Email: {email}\n\
         Amount: {amount} {coin}\n\n\
         Please review and process the request accordingly.\n"
    );
    (subject, body)
}

/// Review-status update sent to the owner.
#[must_use]
pub fn review_status_update(
    name: &str,
    amount: Decimal,
    coin: &str,
    status: ReviewStatus,
) -> (String, String) {
    let subject = "Your Withdrawal Request Status Update".to_string();
    let outcome = match status {
        ReviewStatus::Approved => format!(
            "Congratulations! Your withdrawal request of {amount} {coin} has been approved."
        ),
        ReviewStatus::Rejected => format!(
            "Unfortunately, your withdrawal request of {amount} {coin} has been rejected. \
             Please contact support for further details."
        ),
        ReviewStatus::Pending => format!(
            "Your withdrawal request of {amount} {coin} is currently pending review."
        ),
    };
    let body = format!("Dear {name},\n\n{outcome}\n");
    (subject, body)
}
