pub mod checkout;
pub mod order;
pub mod transaction_record;

pub use checkout::{BankAccountInput, CardDetails, CheckoutForm, PaymentMethod, RefundInput};
pub use order::{
    Address, Order, OrderId, OrderItem, OrderStatus, PaymentMethodKind, ProductCategory,
    ShippingLine,
};
pub use transaction_record::{PaymentDisplay, TransactionRecord, card_brand_name};
