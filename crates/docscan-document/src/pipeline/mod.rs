// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document processing pipeline — recipe selection and step-by-step execution.

pub mod orchestrator;
pub mod recipe;

pub use orchestrator::Pipeline;
pub use recipe::{Denoise, FilterStep, Recipe, high_quality_recipe, mode_recipe, select_recipe};
