//! GST invoices.
//!
//! Invoices are built from the order snapshot (unit price, GST rate and
//! discount share captured at purchase), never from live product data. Each
//! line's net amount is split into taxable value and GST, and the GST is then
//! split into CGST + SGST for intra-state supply or reported as IGST for
//! inter-state supply.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::cart::{round_rupee, split_inclusive};
use crate::types::{Gstin, OrderChannel, OrderId, PaymentType, round_money};

/// Whether GST is split between centre and state or charged as IGST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyType {
    IntraState,
    InterState,
}

impl SupplyType {
    /// Intra-state when the buyer's state matches the seller's or is unknown
    /// (walk-in POS customers).
    #[must_use]
    pub fn for_states(seller_state_code: &str, buyer_state_code: Option<&str>) -> Self {
        match buyer_state_code.map(str::trim) {
            Some(buyer) if !buyer.is_empty() && buyer != seller_state_code.trim() => {
                Self::InterState
            }
            _ => Self::IntraState,
        }
    }
}

/// Seller or buyer details printed on the invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub gstin: Option<Gstin>,
    /// Two digit GST state code.
    pub state_code: Option<String>,
}

impl Party {
    /// State code from the explicit field, else from the GSTIN.
    #[must_use]
    pub fn effective_state_code(&self) -> Option<&str> {
        self.state_code
            .as_deref()
            .or_else(|| self.gstin.as_ref().map(Gstin::state_code))
    }
}

/// An order item as captured at purchase time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub name: String,
    pub hsn_code: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub gst_rate: Decimal,
    /// This item's share of cart-level discounts.
    pub discount: Decimal,
}

/// The order data an invoice is built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSource {
    pub order_id: OrderId,
    pub placed_at: DateTime<Utc>,
    pub channel: OrderChannel,
    pub payment_type: Option<PaymentType>,
    pub seller: Party,
    pub buyer: Party,
    pub items: Vec<InvoiceItem>,
    pub delivery_fee: Decimal,
}

/// One printed invoice line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub index: usize,
    pub name: String,
    pub hsn_code: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub gross: Decimal,
    pub discount: Decimal,
    pub taxable_value: Decimal,
    pub gst_rate: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub total: Decimal,
}

/// Tax totals for one GST rate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSummaryRow {
    pub gst_rate: Decimal,
    pub taxable_value: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub total_tax: Decimal,
}

/// A complete GST invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub number: String,
    pub order_id: OrderId,
    pub issued_at: DateTime<Utc>,
    pub channel: OrderChannel,
    pub payment_type: Option<PaymentType>,
    pub supply_type: SupplyType,
    pub seller: Party,
    pub buyer: Party,
    pub lines: Vec<InvoiceLine>,
    pub tax_summary: Vec<TaxSummaryRow>,
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub taxable_total: Decimal,
    pub cgst_total: Decimal,
    pub sgst_total: Decimal,
    pub igst_total: Decimal,
    pub tax_total: Decimal,
    pub delivery_fee: Decimal,
    pub grand_total: Decimal,
    pub round_off: Decimal,
    pub payable: Decimal,
    pub amount_in_words: String,
}

/// Invoice number for an order: `INV-<YYYYMM>-<order id, 6 digits>`.
#[must_use]
pub fn invoice_number(order_id: OrderId, placed_at: DateTime<Utc>) -> String {
    format!("INV-{}-{:06}", placed_at.format("%Y%m"), order_id.as_i32())
}

/// Split GST into `(cgst, sgst, igst)` for the supply type.
fn split_tax(gst: Decimal, supply: SupplyType) -> (Decimal, Decimal, Decimal) {
    match supply {
        SupplyType::IntraState => {
            let cgst = round_money(gst / Decimal::TWO);
            (cgst, gst - cgst, Decimal::ZERO)
        }
        SupplyType::InterState => (Decimal::ZERO, Decimal::ZERO, gst),
    }
}

impl Invoice {
    /// Build an invoice from an order snapshot.
    #[must_use]
    pub fn build(source: InvoiceSource) -> Self {
        let seller_state = source.seller.effective_state_code().unwrap_or_default();
        let supply_type = SupplyType::for_states(seller_state, source.buyer.effective_state_code());

        let mut lines = Vec::with_capacity(source.items.len());
        let mut summary: BTreeMap<Decimal, TaxSummaryRow> = BTreeMap::new();

        for (i, item) in source.items.into_iter().enumerate() {
            let gross = round_money(item.unit_price * Decimal::from(item.quantity));
            let discount = item.discount.clamp(Decimal::ZERO, gross);
            let total = gross - discount;
            let (taxable_value, gst) = split_inclusive(total, item.gst_rate);
            let (cgst, sgst, igst) = split_tax(gst, supply_type);

            let row = summary
                .entry(item.gst_rate.normalize())
                .or_insert_with(|| TaxSummaryRow {
                    gst_rate: item.gst_rate.normalize(),
                    ..TaxSummaryRow::default()
                });
            row.taxable_value += taxable_value;
            row.cgst += cgst;
            row.sgst += sgst;
            row.igst += igst;
            row.total_tax += gst;

            lines.push(InvoiceLine {
                index: i + 1,
                name: item.name,
                hsn_code: item.hsn_code,
                quantity: item.quantity,
                unit_price: item.unit_price,
                gross,
                discount,
                taxable_value,
                gst_rate: item.gst_rate,
                cgst,
                sgst,
                igst,
                total,
            });
        }

        let tax_summary: Vec<TaxSummaryRow> = summary.into_values().collect();
        let subtotal: Decimal = lines.iter().map(|l| l.gross).sum();
        let discount_total: Decimal = lines.iter().map(|l| l.discount).sum();
        let taxable_total: Decimal = tax_summary.iter().map(|r| r.taxable_value).sum();
        let cgst_total: Decimal = tax_summary.iter().map(|r| r.cgst).sum();
        let sgst_total: Decimal = tax_summary.iter().map(|r| r.sgst).sum();
        let igst_total: Decimal = tax_summary.iter().map(|r| r.igst).sum();
        let tax_total = cgst_total + sgst_total + igst_total;
        let delivery_fee = round_money(source.delivery_fee.max(Decimal::ZERO));
        let grand_total = subtotal - discount_total + delivery_fee;
        let payable = round_rupee(grand_total);

        Self {
            number: invoice_number(source.order_id, source.placed_at),
            order_id: source.order_id,
            issued_at: source.placed_at,
            channel: source.channel,
            payment_type: source.payment_type,
            supply_type,
            seller: source.seller,
            buyer: source.buyer,
            lines,
            tax_summary,
            subtotal,
            discount_total,
            taxable_total,
            cgst_total,
            sgst_total,
            igst_total,
            tax_total,
            delivery_fee,
            grand_total,
            round_off: payable - grand_total,
            payable,
            amount_in_words: amount_in_words(payable),
        }
    }
}

const ONES: [&str; 20] = [
    "", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine", "Ten", "Eleven",
    "Twelve", "Thirteen", "Fourteen", "Fifteen", "Sixteen", "Seventeen", "Eighteen", "Nineteen",
];

const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

fn lookup(table: &[&'static str], n: u64) -> &'static str {
    usize::try_from(n)
        .ok()
        .and_then(|i| table.get(i))
        .copied()
        .unwrap_or_default()
}

/// Words for `0 < n < 100`.
fn below_hundred(n: u64) -> String {
    if n < 20 {
        return lookup(&ONES, n).to_owned();
    }
    let tens = lookup(&TENS, n / 10);
    match n % 10 {
        0 => tens.to_owned(),
        unit => format!("{tens} {}", lookup(&ONES, unit)),
    }
}

/// Words for a whole number using the Indian system (thousand, lakh, crore).
#[must_use]
pub fn number_in_words(n: u64) -> String {
    if n == 0 {
        return "Zero".to_owned();
    }

    let mut parts = Vec::new();
    let crore = n / 10_000_000;
    if crore > 0 {
        parts.push(format!("{} Crore", number_in_words(crore)));
    }
    let rest = n % 10_000_000;
    for (divisor, modulus, label) in [(100_000, 100, "Lakh"), (1_000, 100, "Thousand"), (100, 10, "Hundred")] {
        let count = rest / divisor % modulus;
        if count > 0 {
            parts.push(format!("{} {label}", below_hundred(count)));
        }
    }
    let units = rest % 100;
    if units > 0 {
        parts.push(below_hundred(units));
    }
    parts.join(" ")
}

/// `"Rupees ... [and ... Paise] Only"` for an amount.
#[must_use]
pub fn amount_in_words(amount: Decimal) -> String {
    let amount = round_money(amount.abs());
    let rupees = amount.trunc().to_u64().unwrap_or_default();
    let paise = (amount.fract() * Decimal::ONE_HUNDRED)
        .to_u64()
        .unwrap_or_default();
    if paise == 0 {
        format!("Rupees {} Only", number_in_words(rupees))
    } else {
        format!(
            "Rupees {} and {} Paise Only",
            number_in_words(rupees),
            below_hundred(paise)
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use super::*;

    fn seller() -> Party {
        Party {
            name: "Bazaar Stores".to_string(),
            gstin: Some(Gstin::parse("27AAPFU0939F1ZV").unwrap()),
            ..Party::default()
        }
    }

    fn item(name: &str, unit_price: Decimal, quantity: u32, rate: Decimal) -> InvoiceItem {
        InvoiceItem {
            name: name.to_string(),
            hsn_code: Some("0401".to_string()),
            quantity,
            unit_price,
            gst_rate: rate,
            discount: Decimal::ZERO,
        }
    }

    fn source(buyer: Party, items: Vec<InvoiceItem>) -> InvoiceSource {
        InvoiceSource {
            order_id: OrderId::new(42),
            placed_at: Utc.with_ymd_and_hms(2026, 2, 14, 11, 30, 0).single().unwrap(),
            channel: OrderChannel::Pos,
            payment_type: Some(PaymentType::Cash),
            seller: seller(),
            buyer,
            items,
            delivery_fee: Decimal::ZERO,
        }
    }

    #[test]
    fn test_invoice_number_format() {
        let at = Utc.with_ymd_and_hms(2026, 2, 14, 0, 0, 0).single().unwrap();
        assert_eq!(invoice_number(OrderId::new(42), at), "INV-202602-000042");
    }

    #[test]
    fn test_supply_type() {
        assert_eq!(SupplyType::for_states("27", None), SupplyType::IntraState);
        assert_eq!(SupplyType::for_states("27", Some("27")), SupplyType::IntraState);
        assert_eq!(SupplyType::for_states("27", Some("")), SupplyType::IntraState);
        assert_eq!(SupplyType::for_states("27", Some("29")), SupplyType::InterState);
    }

    #[test]
    fn test_intra_state_invoice_splits_cgst_sgst() {
        let invoice = Invoice::build(source(
            Party::default(),
            vec![
                item("Milk", dec!(105), 2, dec!(5)),
                item("Soap", dec!(118), 1, dec!(18)),
            ],
        ));

        assert_eq!(invoice.supply_type, SupplyType::IntraState);
        assert_eq!(invoice.taxable_total, dec!(300));
        assert_eq!(invoice.cgst_total, dec!(14));
        assert_eq!(invoice.sgst_total, dec!(14));
        assert_eq!(invoice.igst_total, Decimal::ZERO);
        assert_eq!(invoice.payable, dec!(328));
        assert_eq!(invoice.tax_summary.len(), 2);
        assert_eq!(invoice.tax_summary.first().unwrap().gst_rate, dec!(5));
        assert_eq!(invoice.tax_summary.first().unwrap().cgst, dec!(5));
    }

    #[test]
    fn test_inter_state_invoice_uses_igst() {
        let buyer = Party {
            name: "Karnataka Traders".to_string(),
            gstin: Some(Gstin::parse("29AAGCB7383J1Z4").unwrap()),
            ..Party::default()
        };
        let invoice = Invoice::build(source(buyer, vec![item("Soap", dec!(118), 1, dec!(18))]));
        assert_eq!(invoice.supply_type, SupplyType::InterState);
        assert_eq!(invoice.igst_total, dec!(18));
        assert_eq!(invoice.cgst_total, Decimal::ZERO);
    }

    #[test]
    fn test_odd_gst_split_reconciles() {
        let invoice = Invoice::build(source(
            Party::default(),
            vec![item("Biscuits", dec!(10.01), 1, dec!(18))],
        ));
        let line = invoice.lines.first().unwrap();
        assert_eq!(line.taxable_value, dec!(8.48));
        assert_eq!(line.cgst + line.sgst, dec!(1.53));
        assert_eq!(line.taxable_value + line.cgst + line.sgst, line.total);
    }

    #[test]
    fn test_discounts_and_summary_reconcile() {
        let mut discounted = item("Ghee", dec!(560), 1, dec!(12));
        discounted.discount = dec!(56);
        let mut src = source(Party::default(), vec![discounted, item("Rice", dec!(90), 3, dec!(5))]);
        src.delivery_fee = dec!(30);
        let invoice = Invoice::build(src);

        assert_eq!(invoice.subtotal, dec!(830));
        assert_eq!(invoice.discount_total, dec!(56));
        assert_eq!(invoice.grand_total, dec!(804));
        let lines_total: Decimal = invoice.lines.iter().map(|l| l.total).sum();
        assert_eq!(invoice.taxable_total + invoice.tax_total, lines_total);
    }

    #[test]
    fn test_product_coupon_keeps_each_slab_reconciled() {
        use crate::cart::{Adjustments, CartLine, CartTotals};
        use crate::types::ProductId;

        let cart_line = |id: i32, price: Decimal, rate: Decimal| CartLine {
            product_id: ProductId::new(id),
            combo_id: None,
            name: format!("Product {id}"),
            hsn_code: None,
            list_price: price,
            unit_price: price,
            quantity: 1,
            gst_rate: rate,
        };
        let totals = CartTotals::compute(
            vec![cart_line(1, dec!(118), dec!(18)), cart_line(2, dec!(1050), dec!(5))],
            &Adjustments {
                coupon_discount: dec!(59),
                coupon_scope: Some(ProductId::new(1)),
                ..Adjustments::default()
            },
        )
        .unwrap();
        let items = totals
            .lines
            .iter()
            .map(|l| InvoiceItem {
                name: l.line.name.clone(),
                hsn_code: None,
                quantity: l.line.quantity,
                unit_price: l.line.unit_price,
                gst_rate: l.line.gst_rate,
                discount: l.discount,
            })
            .collect();
        let invoice = Invoice::build(source(Party::default(), items));

        for row in &invoice.tax_summary {
            let slab_net: Decimal = invoice
                .lines
                .iter()
                .filter(|l| l.gst_rate.normalize() == row.gst_rate)
                .map(|l| l.total)
                .sum();
            assert_eq!(row.taxable_value + row.total_tax, slab_net);
        }
        let five = invoice.tax_summary.first().unwrap();
        assert_eq!((five.taxable_value, five.total_tax), (dec!(1000), dec!(50)));
        let eighteen = invoice.tax_summary.get(1).unwrap();
        assert_eq!((eighteen.taxable_value, eighteen.total_tax), (dec!(50), dec!(9)));
        assert_eq!(invoice.payable, totals.payable);
    }

    #[test]
    fn test_number_in_words() {
        assert_eq!(number_in_words(0), "Zero");
        assert_eq!(number_in_words(15), "Fifteen");
        assert_eq!(number_in_words(328), "Three Hundred Twenty Eight");
        assert_eq!(number_in_words(1_000), "One Thousand");
        assert_eq!(
            number_in_words(123_456),
            "One Lakh Twenty Three Thousand Four Hundred Fifty Six"
        );
        assert_eq!(number_in_words(25_000_000), "Two Crore Fifty Lakh");
    }

    #[test]
    fn test_amount_in_words() {
        assert_eq!(amount_in_words(dec!(328)), "Rupees Three Hundred Twenty Eight Only");
        assert_eq!(
            amount_in_words(dec!(12.50)),
            "Rupees Twelve and Fifty Paise Only"
        );
    }
}
