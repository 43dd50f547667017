// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lookup collaborators used by the command dispatcher and prompt builder.

pub mod translate;
pub mod weather;

pub use translate::ProviderTranslator;
pub use weather::{OpenWeatherClient, UnconfiguredWeather};
