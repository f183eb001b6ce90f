use crate::error::Result;
use crate::status::{Permission, RowStatus};
use crate::table::{Table, PERMISSION_COL, ROW_STATUS_COL};

// ---------------------------------------------------------------------------
// Row selection
// ---------------------------------------------------------------------------

/// The unique row holding the GO grant, if any: status READY, or RUNNING
/// with the grant still in place. A crash mid-run leaves the active row at
/// RUNNING without revoking its permission; it stays runnable so the next
/// trigger resumes it through skip-DONE semantics. The promotion algorithm
/// guarantees at most one GO grant exists.
pub fn runnable_row(table: &Table) -> Option<usize> {
    (0..table.rows.len()).find(|&i| {
        matches!(table.row_status(i), RowStatus::Ready | RowStatus::Running)
            && table.permission(i) == Permission::Go
    })
}

// ---------------------------------------------------------------------------
// Promotion
// ---------------------------------------------------------------------------

/// Select the next eligible row and grant it permission to run.
///
/// If a granted row already exists this is an idempotent no-op that
/// returns it unchanged. Otherwise the candidate is the first row after the
/// last DONE row whose status is neither DONE nor BLOCKED (blocked rows are
/// skipped when scanning forward, same as done ones). The candidate's status
/// is set to READY only if it was blank; every row's permission is reset to
/// PAUSE before the candidate alone gets GO, so the uniqueness invariant
/// holds by construction.
///
/// Returns the candidate's row index, or `None` when nothing is eligible.
/// The caller is responsible for persisting the table.
pub fn promote(table: &mut Table) -> Result<Option<usize>> {
    if let Some(existing) = runnable_row(table) {
        return Ok(Some(existing));
    }

    table.require_column(ROW_STATUS_COL)?;
    table.require_column(PERMISSION_COL)?;

    let last_done = (0..table.rows.len()).rev().find(|&i| table.row_status(i) == RowStatus::Done);
    let start = last_done.map_or(0, |i| i + 1);

    let candidate = (start..table.rows.len()).find(|&i| {
        !matches!(table.row_status(i), RowStatus::Done | RowStatus::Blocked)
    });
    let Some(candidate) = candidate else {
        return Ok(None);
    };

    for i in 0..table.rows.len() {
        table.set(i, PERMISSION_COL, Permission::Pause.as_str())?;
    }
    if table.row_status(candidate) == RowStatus::Backlog {
        table.set(candidate, ROW_STATUS_COL, RowStatus::Ready.as_str())?;
    }
    table.set(candidate, PERMISSION_COL, Permission::Go.as_str())?;

    Ok(Some(candidate))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
