//! Case schema versions.

use crate::CaseError;
use crate::schema::Case;

pub const LATEST_VERSION: u32 = 1;

/// Bring `case` up to [`LATEST_VERSION`].
///
/// Version 0 files predate the `version` key; their layout is otherwise
/// identical to version 1.
pub fn migrate_to_latest(mut case: Case) -> Result<Case, CaseError> {
    while case.version < LATEST_VERSION {
        case = migrate_one_version(case)?;
    }
    Ok(case)
}

fn migrate_one_version(mut case: Case) -> Result<Case, CaseError> {
    match case.version {
        0 => {
            case.version = 1;
            Ok(case)
        }
        v => Err(CaseError::Migration {
            what: format!("No migration path from version {v}"),
        }),
    }
}
