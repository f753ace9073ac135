use genpay_sdk::objects::charge::{
    Address as ChargeAddress, AddressKind, BilletPayment, CardOptions, CardPayment, Category,
    ChargeRequest, Commissioning, Customer, InstallmentPlan, Item, OrderDetails, Payment, Phone,
};
use rust_decimal::Decimal;
use time::{Date, Duration};

use super::BuildError;
use crate::config::{BILLET_EXPIRY_DAYS, CheckoutSettings};
use crate::entities::{Address, CardDetails, CheckoutForm, Order, OrderItem, PaymentMethod};
use crate::utils::text::{only_digits, parse_phone, strip_diacritics, truncate_chars};

const ITEM_DESCRIPTION_MAX_CHARS: usize = 255;
const CUSTOMER_BIRTH_DATE: &str = "1999-01-01";
const COMMISSIONING_KIND: &str = "rakuten_logistics";

/// Assemble the charge body for `order`.
///
/// The charged amount is the order total plus the plan's interest. Card
/// payments require a plan whose quantity matches the one the buyer picked;
/// billet payments ignore `plan`.
pub fn build_charge(
    order: &Order,
    form: &CheckoutForm,
    plan: Option<&InstallmentPlan>,
    settings: &CheckoutSettings,
    today: Date,
) -> Result<ChargeRequest, BuildError> {
    let interest = plan.map(|p| p.interest_amount).unwrap_or(Decimal::ZERO);
    let amount = order.total + interest;
    let customer_name = order.billing.full_name();

    let payment = match &form.payment {
        PaymentMethod::CreditCard(card) => {
            Payment::CreditCard(card_payment(card, plan, amount)?)
        }
        PaymentMethod::Billet => Payment::Billet(BilletPayment {
            expires_on: format_date(today.saturating_add(Duration::days(BILLET_EXPIRY_DAYS))),
            amount: order.total,
        }),
    };

    let phone = parse_phone(order.billing.phone.as_deref().unwrap_or_default())?;
    let phones = [AddressKind::Billing, AddressKind::Shipping]
        .into_iter()
        .map(|kind| Phone {
            kind,
            reference: "others".to_owned(),
            number: phone.clone(),
        })
        .collect();

    let mut addresses = Vec::with_capacity(2);
    let billing = (!order.billing.address_1.trim().is_empty()).then(|| {
        charge_address(
            AddressKind::Billing,
            &customer_name,
            &order.billing,
            form.billing_number.as_deref(),
            form.billing_neighborhood.as_deref(),
        )
    });
    if let Some(billing) = &billing {
        addresses.push(billing.clone());
    }
    if form.ship_to_different_address {
        addresses.push(charge_address(
            AddressKind::Shipping,
            &customer_name,
            &order.shipping,
            form.shipping_number.as_deref(),
            form.shipping_neighborhood.as_deref(),
        ));
    } else if let Some(mut shipping) = billing {
        shipping.kind = AddressKind::Shipping;
        addresses.push(shipping);
    }

    let business_name = if order.billing.company.trim().is_empty() {
        customer_name.clone()
    } else {
        order.billing.company.clone()
    };

    let customer = Customer {
        document: only_digits(&form.document),
        name: customer_name,
        business_name,
        email: order.billing_email().unwrap_or_default().to_owned(),
        birth_date: CUSTOMER_BIRTH_DATE.to_owned(),
        kind: "personal".to_owned(),
        addresses,
        phones,
    };

    let details = OrderDetails {
        reference: order.id.to_string(),
        payer_ip: order.customer_ip.clone(),
        items_amount: order.subtotal,
        shipping_amount: order.shipping_total,
        taxes_amount: order.total_tax + interest,
        discount_amount: order.discount_total,
        items: order.items.iter().map(charge_item).collect(),
    };

    Ok(ChargeRequest {
        reference: order.number.clone(),
        amount,
        currency: settings.currency.clone(),
        webhook_url: settings.webhook_url.clone(),
        fingerprint: form.fingerprint.clone(),
        payments: vec![payment],
        customer,
        order: details,
        commissionings: commissionings(order, settings),
    })
}

fn card_payment(
    card: &CardDetails,
    plan: Option<&InstallmentPlan>,
    amount: Decimal,
) -> Result<CardPayment, BuildError> {
    if card.installments == 0 {
        return Err(BuildError::InvalidInstallmentQuantity(0));
    }
    if let Some(plan) = plan.filter(|p| p.quantity != card.installments) {
        return Err(BuildError::InvalidInstallmentQuantity(plan.quantity));
    }
    let required = [
        ("brand", &card.brand),
        ("token", &card.token),
        ("cvv", &card.cvv),
        ("holder_name", &card.holder_name),
        ("holder_document", &card.holder_document),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(BuildError::MissingCardDetails(*field));
    }

    Ok(CardPayment {
        reference: "1".to_owned(),
        amount,
        installments_quantity: card.installments,
        brand: card.brand.to_lowercase(),
        token: card.token.clone(),
        cvv: card.cvv.clone(),
        holder_name: card.holder_name.clone(),
        holder_document: card.holder_document.clone(),
        options: CardOptions::default(),
        installments: plan.cloned(),
    })
}

fn charge_address(
    kind: AddressKind,
    contact: &str,
    address: &Address,
    number: Option<&str>,
    district: Option<&str>,
) -> ChargeAddress {
    let non_empty = |s: Option<&str>| s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned);
    ChargeAddress {
        kind,
        contact: contact.to_owned(),
        street: address.address_1.clone(),
        complement: address.address_2.clone(),
        city: address.city.clone(),
        state: address.state.clone(),
        country: address.country.clone(),
        zipcode: only_digits(&address.postcode),
        number: non_empty(number),
        district: non_empty(district),
    }
}

fn charge_item(item: &OrderItem) -> Item {
    let reference = match item.sku.as_deref().map(str::trim) {
        Some(sku) if !sku.is_empty() => strip_diacritics(sku),
        _ => item.product_id.to_string(),
    };
    Item {
        reference,
        description: truncate_chars(&item.name, ITEM_DESCRIPTION_MAX_CHARS).to_owned(),
        amount: item.price,
        quantity: item.quantity,
        total_amount: item.total,
        categories: item
            .categories
            .iter()
            .map(|c| Category {
                name: c.name.clone(),
                id: c.id.clone(),
            })
            .collect(),
    }
}

fn commissionings(order: &Order, settings: &CheckoutSettings) -> Vec<Commissioning> {
    let Some(line) = order.shipping_lines.first() else {
        return Vec::new();
    };
    if line.method_id != settings.logistics_method_id {
        return Vec::new();
    }
    vec![Commissioning {
        reference: order.id.to_string(),
        kind: COMMISSIONING_KIND.to_owned(),
        amount: order.shipping_total,
        calculation_code: line.calculation_code.clone().unwrap_or_default(),
        postage_service_code: line.postage_service_code.clone().unwrap_or_default(),
    }]
}

fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::entities::{OrderStatus, PaymentMethodKind, ProductCategory, ShippingLine};
    use std::str::FromStr;
    use time::Month;

    pub(crate) fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    pub(crate) fn sample_order() -> Order {
        Order {
            id: 42,
            number: "1042".to_string(),
            status: OrderStatus::Pending,
            currency: "BRL".to_string(),
            total: dec("150.00"),
            subtotal: dec("140.00"),
            shipping_total: dec("10.00"),
            total_tax: Decimal::ZERO,
            discount_total: Decimal::ZERO,
            total_refunded: Decimal::ZERO,
            customer_ip: "200.1.2.3".to_string(),
            payment_method: Some(PaymentMethodKind::CreditCard),
            billing: Address {
                first_name: "Maria".to_string(),
                last_name: "Silva".to_string(),
                address_1: "Rua Augusta".to_string(),
                address_2: "Apto 12".to_string(),
                city: "São Paulo".to_string(),
                state: "SP".to_string(),
                postcode: "01305-000".to_string(),
                country: "BR".to_string(),
                email: Some("maria@example.com".to_string()),
                phone: Some("(11) 98765-4321".to_string()),
                ..Default::default()
            },
            shipping: Address {
                first_name: "Maria".to_string(),
                last_name: "Silva".to_string(),
                address_1: "Av. Paulista".to_string(),
                city: "São Paulo".to_string(),
                state: "SP".to_string(),
                postcode: "01310-100".to_string(),
                country: "BR".to_string(),
                ..Default::default()
            },
            items: vec![OrderItem {
                product_id: 7,
                sku: Some("camiseta-algodão".to_string()),
                name: "Camiseta".to_string(),
                quantity: 2,
                price: dec("70.00"),
                total: dec("140.00"),
                categories: vec![ProductCategory {
                    id: "15".to_string(),
                    name: "Roupas".to_string(),
                }],
            }],
            shipping_lines: vec![ShippingLine {
                method_id: "flat_rate".to_string(),
                ..Default::default()
            }],
        }
    }

    pub(crate) fn card_form(installments: u32) -> CheckoutForm {
        CheckoutForm {
            payment: PaymentMethod::CreditCard(CardDetails {
                installments,
                brand: "Visa".to_string(),
                token: "tok_abc".to_string(),
                cvv: "123".to_string(),
                holder_name: "MARIA SILVA".to_string(),
                holder_document: "12345678909".to_string(),
            }),
            fingerprint: "fp-1".to_string(),
            document: "123.456.789-09".to_string(),
            billing_number: Some("100".to_string()),
            billing_neighborhood: Some("Consolação".to_string()),
            shipping_number: None,
            shipping_neighborhood: None,
            ship_to_different_address: false,
        }
    }

    fn today() -> Date {
        Date::from_calendar_date(2026, Month::October, 30).unwrap()
    }

    fn settings() -> CheckoutSettings {
        CheckoutSettings::new("https://shop.example/genpay/webhook")
    }

    #[test]
    fn test_interest_free_card_charge() {
        let order = sample_order();
        let plan = InstallmentPlan::interest_free(order.total, 3);
        let charge = build_charge(&order, &card_form(3), Some(&plan), &settings(), today()).unwrap();

        assert_eq!(charge.amount, dec("150.00"));
        assert_eq!(charge.reference, "1042");
        assert_eq!(charge.order.reference, "42");
        let Payment::CreditCard(card) = &charge.payments[0] else {
            unreachable!("expected a card payment");
        };
        assert_eq!(card.brand, "visa");
        assert_eq!(card.installments_quantity, 3);
        let plan = card.installments.as_ref().unwrap();
        assert_eq!(plan.installment_amount, dec("50.00"));
        assert_eq!(plan.interest_amount, dec("0"));
        assert_eq!(card.options, CardOptions::default());
    }

    #[test]
    fn test_interest_is_added_on_top() {
        let order = sample_order();
        let plan = InstallmentPlan {
            total: dec("157.50"),
            quantity: 6,
            interest_percent: dec("5"),
            interest_amount: dec("7.50"),
            installment_amount: dec("26.25"),
        };
        let charge = build_charge(&order, &card_form(6), Some(&plan), &settings(), today()).unwrap();
        assert_eq!(charge.amount, dec("157.50"));
        assert_eq!(charge.payments[0].amount(), dec("157.50"));
        assert_eq!(charge.order.taxes_amount, dec("7.50"));
    }

    #[test]
    fn test_plan_must_match_chosen_quantity() {
        let order = sample_order();
        let plan = InstallmentPlan::interest_free(order.total, 2);
        let err = build_charge(&order, &card_form(3), Some(&plan), &settings(), today()).unwrap_err();
        assert_eq!(err, BuildError::InvalidInstallmentQuantity(2));
    }

    #[test]
    fn test_missing_card_token() {
        let order = sample_order();
        let mut form = card_form(1);
        if let PaymentMethod::CreditCard(card) = &mut form.payment {
            card.token.clear();
        }
        let err = build_charge(&order, &form, None, &settings(), today()).unwrap_err();
        assert_eq!(err, BuildError::MissingCardDetails("token"));
    }

    #[test]
    fn test_billet_expires_three_days_out() {
        let order = sample_order();
        let mut form = card_form(1);
        form.payment = PaymentMethod::Billet;
        let charge = build_charge(&order, &form, None, &settings(), today()).unwrap();
        let Payment::Billet(billet) = &charge.payments[0] else {
            unreachable!("expected a billet payment");
        };
        assert_eq!(billet.expires_on, "2026-11-02");
        assert_eq!(billet.amount, dec("150.00"));
        assert_eq!(charge.amount, dec("150.00"));
    }

    #[test]
    fn test_customer_normalization() {
        let order = sample_order();
        let charge = build_charge(&order, &card_form(1), None, &settings(), today()).unwrap();
        let customer = &charge.customer;
        assert_eq!(customer.document, "12345678909");
        assert_eq!(customer.name, "Maria Silva");
        assert_eq!(customer.business_name, "Maria Silva");
        assert_eq!(customer.phones.len(), 2);
        assert_eq!(customer.phones[1].kind, AddressKind::Shipping);
        assert_eq!(customer.phones[0].number.area_code, "11");

        assert_eq!(customer.addresses.len(), 2);
        let billing = &customer.addresses[0];
        assert_eq!(billing.zipcode, "01305000");
        assert_eq!(billing.number.as_deref(), Some("100"));
        assert_eq!(billing.district.as_deref(), Some("Consolação"));
        let shipping = &customer.addresses[1];
        assert_eq!(shipping.kind, AddressKind::Shipping);
        assert_eq!(shipping.street, billing.street);
    }

    #[test]
    fn test_distinct_shipping_address() {
        let order = sample_order();
        let mut form = card_form(1);
        form.ship_to_different_address = true;
        form.shipping_number = Some("1578".to_string());
        let charge = build_charge(&order, &form, None, &settings(), today()).unwrap();
        let shipping = &charge.customer.addresses[1];
        assert_eq!(shipping.street, "Av. Paulista");
        assert_eq!(shipping.zipcode, "01310100");
        assert_eq!(shipping.number.as_deref(), Some("1578"));
        assert_eq!(shipping.district, None);
    }

    #[test]
    fn test_no_billing_street_means_no_addresses() {
        let mut order = sample_order();
        order.billing.address_1.clear();
        let charge = build_charge(&order, &card_form(1), None, &settings(), today()).unwrap();
        assert!(charge.customer.addresses.is_empty());
    }

    #[test]
    fn test_malformed_phone_is_rejected() {
        let mut order = sample_order();
        order.billing.phone = Some("11 98765 4321".to_string());
        let err = build_charge(&order, &card_form(1), None, &settings(), today()).unwrap_err();
        assert!(matches!(err, BuildError::MalformedPhoneNumber(_)));
    }

    #[test]
    fn test_items_use_sku_or_product_id() {
        let mut order = sample_order();
        order.items.push(OrderItem {
            product_id: 8,
            sku: None,
            name: "x".repeat(300),
            quantity: 1,
            price: dec("5.00"),
            total: dec("5.00"),
            categories: Vec::new(),
        });
        let charge = build_charge(&order, &card_form(1), None, &settings(), today()).unwrap();
        assert_eq!(charge.order.items[0].reference, "camiseta-algodao");
        assert_eq!(charge.order.items[0].categories[0].name, "Roupas");
        assert_eq!(charge.order.items[1].reference, "8");
        assert_eq!(charge.order.items[1].description.chars().count(), 255);
    }

    #[test]
    fn test_commissioning_only_for_logistics_shipping() {
        let mut order = sample_order();
        let charge = build_charge(&order, &card_form(1), None, &settings(), today()).unwrap();
        assert!(charge.commissionings.is_empty());

        order.shipping_lines = vec![ShippingLine {
            method_id: "rakuten-log".to_string(),
            calculation_code: Some("calc-1".to_string()),
            postage_service_code: Some("post-9".to_string()),
        }];
        let charge = build_charge(&order, &card_form(1), None, &settings(), today()).unwrap();
        assert_eq!(charge.commissionings.len(), 1);
        let commissioning = &charge.commissionings[0];
        assert_eq!(commissioning.kind, "rakuten_logistics");
        assert_eq!(commissioning.amount, dec("10.00"));
        assert_eq!(commissioning.calculation_code, "calc-1");
    }
}
