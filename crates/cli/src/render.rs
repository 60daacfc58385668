//! Text and JSON rendering of ledger results.

use std::io::Write;

use serde::Serialize;

use supplychain_core::ProductId;
use supplychain_infra::{AuditReport, StoredEvent};
use supplychain_products::ProductView;

use crate::OutputFormat;

pub(crate) fn json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

pub(crate) fn product_id(out: &mut dyn Write, format: OutputFormat, id: ProductId) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => json(out, &serde_json::json!({ "id": id })),
        OutputFormat::Text => {
            writeln!(out, "{id}")?;
            Ok(())
        }
    }
}

pub(crate) fn view(out: &mut dyn Write, format: OutputFormat, view: &ProductView) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => json(out, view),
        OutputFormat::Text => {
            writeln!(out, "{}", view_line(view))?;
            Ok(())
        }
    }
}

pub(crate) fn views(out: &mut dyn Write, format: OutputFormat, views: &[ProductView]) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => json(out, views),
        OutputFormat::Text => {
            if views.is_empty() {
                writeln!(out, "no products")?;
            }
            for view in views {
                writeln!(out, "{}", view_line(view))?;
            }
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct HistoryOutput<'a> {
    product: &'a ProductView,
    events: &'a [StoredEvent],
}

pub(crate) fn history(
    out: &mut dyn Write,
    format: OutputFormat,
    product: &ProductView,
    events: &[StoredEvent],
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => json(out, &HistoryOutput { product, events }),
        OutputFormat::Text => {
            writeln!(out, "{}", view_line(product))?;
            for stored in events {
                writeln!(out, "  {}", event_line(stored))?;
            }
            Ok(())
        }
    }
}

pub(crate) fn audit(out: &mut dyn Write, format: OutputFormat, report: &AuditReport) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => json(out, report),
        OutputFormat::Text => {
            let verdict = if report.is_clean() { "ok" } else { "FAILED" };
            writeln!(
                out,
                "{verdict}: {} products, {} events, {} findings",
                report.products_checked,
                report.events_checked,
                report.findings.len()
            )?;
            for finding in &report.findings {
                match finding.product_id {
                    Some(id) => writeln!(out, "  [{:?}] product {id}: {}", finding.kind, finding.detail)?,
                    None => writeln!(out, "  [{:?}] {}", finding.kind, finding.detail)?,
                }
            }
            Ok(())
        }
    }
}

fn view_line(view: &ProductView) -> String {
    format!(
        "#{} {} [{}] owner={} created={}",
        view.id,
        view.name,
        view.state_label,
        view.owner,
        view.created_at.to_rfc3339()
    )
}

fn event_line(stored: &StoredEvent) -> String {
    let event = &stored.event;
    let from = event.previous_state.map_or("-", |s| s.label());
    format!(
        "{:>4} {} {} -> {} by {}",
        stored.sequence_number,
        event.occurred_at.to_rfc3339(),
        from,
        event.new_state.label(),
        event.actor
    )
}
