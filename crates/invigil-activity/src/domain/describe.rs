//! Display sentences for feed entries.

use invigil_core::actor::SYSTEM_ACTOR_ID;

use super::entries::ActivityEntry;

fn actor_label(actor: &str) -> &str {
    if actor == SYSTEM_ACTOR_ID {
        "System"
    } else {
        actor
    }
}

fn humanize(value: &str) -> String {
    value.replace('_', " ")
}

fn value_or_none(value: Option<&str>) -> String {
    value.map_or_else(|| "none".to_owned(), humanize)
}

fn scope(bulk_count: Option<usize>) -> String {
    match bulk_count {
        Some(count) => format!("{count} tickets"),
        None => "the ticket".to_owned(),
    }
}

/// Renders one activity line. Pure and deterministic.
///
/// `bulk_count` is `Some(n)` for a bulk group of `n` events. Unknown actions
/// fall back to a generic sentence built from the action name.
#[must_use]
pub fn describe(
    action: &str,
    old_value: Option<&str>,
    new_value: Option<&str>,
    actor: &str,
    bulk_count: Option<usize>,
) -> String {
    let who = actor_label(actor);
    let target = scope(bulk_count);
    match action {
        "created" => match bulk_count {
            Some(count) => format!("{who} created {count} tickets"),
            None => format!("{who} created the ticket"),
        },
        "status_changed" => {
            let on = if bulk_count.is_some() {
                format!(" of {target}")
            } else {
                String::new()
            };
            format!(
                "{who} changed the status{on} from {} to {}",
                value_or_none(old_value),
                value_or_none(new_value)
            )
        }
        "assigned" => format!("{who} assigned {} to {target}", value_or_none(new_value)),
        "unassigned" => format!("{who} removed {} from {target}", value_or_none(old_value)),
        "resolved" => format!("{who} auto-resolved {target}"),
        "sla_breached" => match bulk_count {
            Some(count) => format!("SLA target breached on {count} tickets"),
            None => "SLA target breached".to_owned(),
        },
        "deleted" => format!("{who} deleted {target}"),
        other => format!("{who} performed {} on {target}", humanize(other)),
    }
}

/// Renders a reconciled feed entry.
#[must_use]
pub fn describe_entry(entry: &ActivityEntry) -> String {
    let head = entry.head();
    describe(
        &head.action,
        head.old_value.as_deref(),
        head.new_value.as_deref(),
        &head.performed_by,
        entry.is_bulk().then(|| entry.count()),
    )
}
