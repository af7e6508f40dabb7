//! Data layer: table model, loading, column resolution, cleaning, writing.
//!
//! Architecture:
//! ```text
//!   pollution .csv
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → MeasurementTable (Text / Missing cells)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ resolver  │  column names → ColumnMap (date, pm2.5, pm10, aqi)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ cleaner   │  dates parsed + sorted, pollutants numeric + mean-filled
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ writer    │  cleaned table → .csv
//!   └──────────┘
//! ```

pub mod cleaner;
pub mod loader;
pub mod model;
pub mod resolver;
pub mod writer;
