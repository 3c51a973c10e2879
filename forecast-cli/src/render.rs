use std::{fmt, path::Path};

use chrono::NaiveDate;
use forecast_core::{ForecastRow, TrainingReport};

/// Headline for the first projected day followed by the 7-day strip.
struct ForecastView<'a> {
    city: &'a str,
    rows: &'a [ForecastRow],
    today: NaiveDate,
}

impl fmt::Display for ForecastView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(first) = self.rows.first() {
            writeln!(f, "{} – {} ({})", self.city, self.today.format("%A, %d %B"), first.kind())?;
            writeln!(f, "  Temp      {:.1}°C", first.temp)?;
            writeln!(f, "  Humidity  {:.1}%", first.humidity)?;
            writeln!(f, "  Precip    {:.1} mm", first.precip)?;
            writeln!(f, "  Wind      {:.1} km/h", first.windspeed)?;
            writeln!(f)?;
        }

        writeln!(f, "{}-Day Forecast", self.rows.len())?;
        writeln!(
            f,
            "{:<12} {:>8} {:>10} {:>10} {:>11}  {}",
            "Date", "Temp", "Humidity", "Precip", "Wind", "Sky"
        )?;
        for row in self.rows {
            writeln!(
                f,
                "{:<12} {:>6.1}°C {:>9.1}% {:>7.1} mm {:>6.1} km/h  {}",
                row.date_label(),
                row.temp,
                row.humidity,
                row.precip,
                row.windspeed,
                row.kind()
            )?;
        }
        Ok(())
    }
}

pub fn forecast_text(city: &str, rows: &[ForecastRow], today: NaiveDate) -> String {
    ForecastView { city, rows, today }.to_string()
}

pub fn report_text(report: &TrainingReport, model: &Path, features: &Path) -> String {
    format!(
        "{report}Model saved to {}\nFeature order saved to {}\n",
        model.display(),
        features.display()
    )
}
