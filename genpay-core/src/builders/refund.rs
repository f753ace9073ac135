use genpay_sdk::objects::refund::{BankAccount, RefundKind, RefundPayment, RefundRequest};
use genpay_sdk::objects::response::TransactionSnapshot;

use super::BuildError;
use crate::entities::{Order, PaymentMethodKind, RefundInput};
use crate::utils::money::same_amount;
use crate::utils::text::only_digits;

const REFUND_REQUESTER: &str = "merchant";

/// Assemble a refund against the first payment of `prior`.
///
/// The kind is `Total` when the amount equals the order total at cent
/// precision, `Partial` otherwise. Billet refunds carry the bank account
/// the money is transferred to.
pub fn build_refund(
    order: &Order,
    method: PaymentMethodKind,
    input: &RefundInput,
    prior: &TransactionSnapshot,
) -> Result<(RefundKind, RefundRequest), BuildError> {
    let kind = if same_amount(input.amount, order.total) {
        RefundKind::Total
    } else {
        RefundKind::Partial
    };

    let payment_id = prior
        .first_payment_id()
        .ok_or(BuildError::MissingPriorPayment)?;

    let bank_account = match method {
        PaymentMethodKind::CreditCard => None,
        PaymentMethodKind::Billet => {
            let account = input
                .bank_account
                .as_ref()
                .ok_or(BuildError::MissingBankAccount)?;
            Some(BankAccount {
                document: only_digits(&account.document),
                bank_code: only_digits(&account.bank_code),
                bank_agency: only_digits(&account.bank_agency),
                bank_number: account.bank_number.trim().to_owned(),
            })
        }
    };

    let request = RefundRequest {
        requester: REFUND_REQUESTER.to_owned(),
        reason: input.reason.clone(),
        amount: input.amount,
        payments: vec![RefundPayment {
            id: payment_id.to_owned(),
            amount: input.amount,
            bank_account,
        }],
    };
    Ok((kind, request))
}
