//! SLA compliance queries.

use invigil_core::clock::Clock;
use invigil_core::error::DomainError;
use invigil_core::repository::TicketRepository;
use invigil_core::ticket::TicketFilter;
use invigil_tickets::domain::sla::{ComplianceReport, compliance_report};
use tracing::instrument;

/// SLA compliance over every ticket matching `filter`, as of now.
///
/// # Errors
///
/// Returns a store error if the tickets cannot be listed.
#[instrument(skip_all)]
pub async fn get_compliance_report(
    filter: &TicketFilter,
    clock: &dyn Clock,
    tickets: &dyn TicketRepository,
) -> Result<ComplianceReport, DomainError> {
    let matching = tickets.list_all(filter).await?;
    Ok(compliance_report(&matching, clock.now()))
}
