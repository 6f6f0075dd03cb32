//! Orders across both channels, status changes and GST invoices.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::invoice::{Invoice, InvoiceLine, Party, SupplyType, TaxSummaryRow};
use bazaar_core::order::{Order, OrderItem};
use bazaar_core::{OrderChannel, OrderId, OrderStatus, format_inr};

use crate::db::OrderRepository;
use crate::db::orders::OrderFilter;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdminAuth;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub channel: Option<OrderChannel>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

#[instrument(skip(state, _admin))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Vec<Order>>> {
    let filter = OrderFilter {
        status: query.status,
        channel: query.channel,
    };
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    Ok(Json(
        OrderRepository::new(state.pool())
            .list(filter, limit)
            .await?,
    ))
}

#[instrument(skip(state, _admin))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>> {
    let (order, items) = load(&state, id).await?;
    Ok(Json(OrderDetail { order, items }))
}

/// Move an order along its lifecycle.
#[instrument(skip(state, admin), fields(admin_id = %admin.id, status = %request.status))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<OrderId>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<Order>> {
    let order = OrderRepository::new(state.pool())
        .update_status(id, request.status)
        .await?;
    tracing::info!(order_id = %order.id, status = %order.status, "Order status changed");
    Ok(Json(order))
}

/// The invoice as JSON.
#[instrument(skip(state, _admin))]
pub async fn invoice_json(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Invoice>> {
    Ok(Json(invoice(&state, id).await?))
}

/// The printable invoice.
#[instrument(skip(state, _admin))]
pub async fn invoice_html(
    State(state): State<AppState>,
    RequireAdminAuth(_admin): RequireAdminAuth,
    Path(id): Path<OrderId>,
) -> Result<InvoiceTemplate> {
    let invoice = invoice(&state, id).await?;
    Ok(InvoiceTemplate::from(&invoice))
}

async fn load(state: &AppState, id: OrderId) -> Result<(Order, Vec<OrderItem>)> {
    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
    let items = repo.items(id).await?;
    Ok((order, items))
}

async fn invoice(state: &AppState, id: OrderId) -> Result<Invoice> {
    let (order, items) = load(state, id).await?;
    if order.status == OrderStatus::Cancelled {
        return Err(AppError::Conflict(
            "cancelled orders have no invoice".to_string(),
        ));
    }
    let source = order.invoice_source(&items, state.config().seller.party());
    Ok(Invoice::build(source))
}

// =============================================================================
// HTML view
// =============================================================================

/// Party block with display-ready fields.
pub struct PartyView {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub gstin: Option<String>,
    pub state_code: Option<String>,
}

impl From<&Party> for PartyView {
    fn from(party: &Party) -> Self {
        Self {
            name: party.name.clone(),
            address: party.address.clone(),
            phone: party.phone.clone(),
            email: party.email.clone(),
            gstin: party.gstin.as_ref().map(|g| g.as_str().to_owned()),
            state_code: party.effective_state_code().map(str::to_owned),
        }
    }
}

pub struct LineView {
    pub index: usize,
    pub name: String,
    pub hsn_code: String,
    pub quantity: u32,
    pub unit_price: String,
    pub discount: String,
    pub taxable_value: String,
    pub gst_rate: String,
    pub cgst: String,
    pub sgst: String,
    pub igst: String,
    pub total: String,
}

impl From<&InvoiceLine> for LineView {
    fn from(line: &InvoiceLine) -> Self {
        Self {
            index: line.index,
            name: line.name.clone(),
            hsn_code: line.hsn_code.clone().unwrap_or_default(),
            quantity: line.quantity,
            unit_price: format_inr(line.unit_price),
            discount: format_inr(line.discount),
            taxable_value: format_inr(line.taxable_value),
            gst_rate: format!("{}%", line.gst_rate.normalize()),
            cgst: format_inr(line.cgst),
            sgst: format_inr(line.sgst),
            igst: format_inr(line.igst),
            total: format_inr(line.total),
        }
    }
}

pub struct TaxRowView {
    pub gst_rate: String,
    pub taxable_value: String,
    pub cgst: String,
    pub sgst: String,
    pub igst: String,
    pub total_tax: String,
}

impl From<&TaxSummaryRow> for TaxRowView {
    fn from(row: &TaxSummaryRow) -> Self {
        Self {
            gst_rate: format!("{}%", row.gst_rate.normalize()),
            taxable_value: format_inr(row.taxable_value),
            cgst: format_inr(row.cgst),
            sgst: format_inr(row.sgst),
            igst: format_inr(row.igst),
            total_tax: format_inr(row.total_tax),
        }
    }
}

/// Printable GST tax invoice.
#[derive(Template, WebTemplate)]
#[template(path = "invoices/show.html")]
pub struct InvoiceTemplate {
    pub number: String,
    pub issued_on: String,
    pub channel: String,
    pub payment_type: Option<String>,
    pub inter_state: bool,
    pub seller: PartyView,
    pub buyer: PartyView,
    pub lines: Vec<LineView>,
    pub tax_rows: Vec<TaxRowView>,
    pub subtotal: String,
    pub discount_total: String,
    pub taxable_total: String,
    pub cgst_total: String,
    pub sgst_total: String,
    pub igst_total: String,
    pub delivery_fee: Option<String>,
    pub round_off: String,
    pub payable: String,
    pub amount_in_words: String,
}

impl From<&Invoice> for InvoiceTemplate {
    fn from(invoice: &Invoice) -> Self {
        Self {
            number: invoice.number.clone(),
            issued_on: invoice
                .issued_at
                .with_timezone(&Local)
                .format("%d %b %Y")
                .to_string(),
            channel: invoice.channel.to_string(),
            payment_type: invoice.payment_type.map(|p| p.to_string()),
            inter_state: invoice.supply_type == SupplyType::InterState,
            seller: PartyView::from(&invoice.seller),
            buyer: PartyView::from(&invoice.buyer),
            lines: invoice.lines.iter().map(LineView::from).collect(),
            tax_rows: invoice.tax_summary.iter().map(TaxRowView::from).collect(),
            subtotal: format_inr(invoice.subtotal),
            discount_total: format_inr(invoice.discount_total),
            taxable_total: format_inr(invoice.taxable_total),
            cgst_total: format_inr(invoice.cgst_total),
            sgst_total: format_inr(invoice.sgst_total),
            igst_total: format_inr(invoice.igst_total),
            delivery_fee: (!invoice.delivery_fee.is_zero())
                .then(|| format_inr(invoice.delivery_fee)),
            round_off: format_inr(invoice.round_off),
            payable: format_inr(invoice.payable),
            amount_in_words: invoice.amount_in_words.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use bazaar_core::invoice::{InvoiceItem, InvoiceSource};
    use bazaar_core::{Gstin, PaymentType};

    use super::*;

    fn seller() -> Party {
        Party {
            name: "Bazaar Stores".to_string(),
            address: Some("4 MG Road, Bengaluru".to_string()),
            phone: None,
            email: None,
            gstin: Some(Gstin::parse("29AAGCB7383J1Z4").unwrap()),
            state_code: None,
        }
    }

    fn source(buyer_state: Option<&str>) -> InvoiceSource {
        InvoiceSource {
            order_id: OrderId::new(42),
            placed_at: Utc::now(),
            channel: OrderChannel::Pos,
            payment_type: Some(PaymentType::Upi),
            seller: seller(),
            buyer: Party {
                name: "Walk-in Customer".to_string(),
                state_code: buyer_state.map(str::to_string),
                ..Party::default()
            },
            items: vec![InvoiceItem {
                name: "Sunflower Oil 1L".to_string(),
                hsn_code: Some("1512".to_string()),
                quantity: 2,
                unit_price: dec!(168),
                gst_rate: dec!(5),
                discount: dec!(0),
            }],
            delivery_fee: dec!(0),
        }
    }

    #[test]
    fn test_intra_state_invoice_renders_cgst_and_sgst() {
        let invoice = Invoice::build(source(None));
        let html = InvoiceTemplate::from(&invoice).render().unwrap();

        assert!(html.contains(&invoice.number));
        assert!(html.contains("29AAGCB7383J1Z4"));
        assert!(html.contains("Sunflower Oil 1L"));
        assert!(html.contains("CGST"));
        assert!(!html.contains("IGST"));
        assert!(html.contains(&invoice.amount_in_words));
        assert!(html.contains("₹336.00"));
    }

    #[test]
    fn test_inter_state_invoice_renders_igst() {
        let invoice = Invoice::build(source(Some("27")));
        let view = InvoiceTemplate::from(&invoice);
        assert!(view.inter_state);
        assert!(view.delivery_fee.is_none());

        let html = view.render().unwrap();
        assert!(html.contains("IGST"));
        assert!(!html.contains("CGST"));
    }
}
