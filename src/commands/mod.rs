// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod audit;
pub mod check;
pub mod completions;
pub mod modify;
pub mod plan;
pub mod restore;
