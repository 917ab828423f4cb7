// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the queue, thread and checkpoint tables.

pub mod checkpoints;
pub mod queue;
pub mod threads;

use std::str::FromStr;

use rusqlite::types::Type;

/// Read a TEXT column and parse it with `FromStr` (used for strum enums).
pub(crate) fn parse_column<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
