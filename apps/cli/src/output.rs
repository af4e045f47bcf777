//! # Output
//!
//! Command results go to stdout as plain tables, or as pretty JSON with
//! `--json`. Logs and errors go to stderr so stdout stays parseable.

use serde::Serialize;

use crate::commands::car::{CarDto, ImageOutcome, SavedCar};
use crate::commands::customer::CustomerDto;
use crate::commands::printer::PrintersDto;
use crate::commands::sale::SaleDto;

/// Text rendering for terminal output.
pub trait Render {
    fn render(&self) -> String;
}

/// Prints `value` as JSON or as its text rendering.
pub fn emit<T: Serialize + Render>(value: &T, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", value.render());
    }
    Ok(())
}

/// Prints a one-line confirmation, or `{"message": ...}` as JSON.
pub fn emit_message(message: &str, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "message": message }))?);
    } else {
        println!("{}", message);
    }
    Ok(())
}

// =============================================================================
// Tables
// =============================================================================

/// Fixed-width text table. Cells longer than their column are cut with `...`.
struct Table {
    widths: Vec<usize>,
    out: String,
}

impl Table {
    fn new(headers: &[(&str, usize)]) -> Self {
        let mut table = Table {
            widths: headers.iter().map(|(_, w)| *w).collect(),
            out: String::new(),
        };
        let titles: Vec<String> = headers.iter().map(|(h, _)| h.to_string()).collect();
        table.row(&titles);
        let rule: Vec<String> = table.widths.iter().map(|w| "-".repeat(*w)).collect();
        table.row(&rule);
        table
    }

    fn row(&mut self, cells: &[String]) {
        let line: Vec<String> = cells
            .iter()
            .zip(&self.widths)
            .map(|(cell, width)| pad(cell, *width))
            .collect();
        self.out.push_str(line.join("  ").trim_end());
        self.out.push('\n');
    }

    fn finish(self, empty_message: &str, rows: usize) -> String {
        if rows == 0 {
            format!("{}\n", empty_message)
        } else {
            self.out
        }
    }
}

/// Pads or cuts `text` to `width` characters.
fn pad(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count <= width {
        format!("{}{}", text, " ".repeat(width - count))
    } else {
        let cut: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn or_dash(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

fn detail(pairs: &[(&str, String)]) -> String {
    let width = pairs.iter().map(|(k, _)| k.chars().count()).max().unwrap_or(0);
    pairs
        .iter()
        .map(|(k, v)| format!("{}  {}\n", pad(k, width), v))
        .collect()
}

// =============================================================================
// Renderers
// =============================================================================

impl Render for Vec<CarDto> {
    fn render(&self) -> String {
        let mut table = Table::new(&[
            ("ID", 5),
            ("MARCA", 14),
            ("MODELO", 14),
            ("AÑO", 4),
            ("PRECIO", 14),
            ("COLOR", 10),
            ("TRANSMISIÓN", 11),
            ("COMBUSTIBLE", 11),
            ("FOTO", 4),
        ]);
        for car in self {
            table.row(&[
                car.id.to_string(),
                car.make.clone(),
                car.model.clone(),
                car.year.to_string(),
                car.price.clone(),
                car.color.clone(),
                car.transmission.clone(),
                car.fuel.clone(),
                if car.image_url.is_some() { "sí" } else { "no" }.to_string(),
            ]);
        }
        table.finish("No hay autos registrados", self.len())
    }
}

impl Render for CarDto {
    fn render(&self) -> String {
        detail(&[
            ("ID", self.id.to_string()),
            ("Marca", self.make.clone()),
            ("Modelo", self.model.clone()),
            ("Año", self.year.to_string()),
            ("Precio", self.price.clone()),
            ("Color", self.color.clone()),
            ("Transmisión", self.transmission.clone()),
            ("Combustible", self.fuel.clone()),
            ("Imagen", or_dash(&self.image_url)),
            ("Registrado", self.registered_at.format("%Y-%m-%d %H:%M").to_string()),
        ])
    }
}

impl Render for SavedCar {
    fn render(&self) -> String {
        let mut text = self.car.render();
        if let ImageOutcome::UploadFailed { message } = &self.image {
            text.push_str(&format!(
                "\nAviso: la imagen no se pudo subir ({}); el auto se guardó sin ella\n",
                message
            ));
        }
        text
    }
}

impl Render for Vec<CustomerDto> {
    fn render(&self) -> String {
        let mut table = Table::new(&[
            ("ID", 5),
            ("NOMBRE", 24),
            ("TELÉFONO", 14),
            ("CORREO", 26),
            ("DIRECCIÓN", 28),
        ]);
        for customer in self {
            table.row(&[
                customer.id.to_string(),
                customer.name.clone(),
                or_dash(&customer.phone),
                or_dash(&customer.email),
                or_dash(&customer.address),
            ]);
        }
        table.finish("No hay clientes registrados", self.len())
    }
}

impl Render for CustomerDto {
    fn render(&self) -> String {
        detail(&[
            ("ID", self.id.to_string()),
            ("Nombre", self.name.clone()),
            ("Teléfono", or_dash(&self.phone)),
            ("Correo", or_dash(&self.email)),
            ("Dirección", or_dash(&self.address)),
            ("Registrado", self.registered_at.format("%Y-%m-%d %H:%M").to_string()),
        ])
    }
}

impl Render for Vec<SaleDto> {
    fn render(&self) -> String {
        let mut table = Table::new(&[
            ("ID", 5),
            ("FECHA", 10),
            ("AUTO", 28),
            ("CLIENTE", 22),
            ("MONTO", 14),
            ("PAGO", 13),
        ]);
        for sale in self {
            table.row(&[
                sale.id.to_string(),
                sale.sale_date.format("%Y-%m-%d").to_string(),
                sale.car.clone(),
                sale.customer.clone(),
                sale.amount.clone(),
                sale.payment_method.clone(),
            ]);
        }
        table.finish("No hay ventas registradas", self.len())
    }
}

impl Render for SaleDto {
    fn render(&self) -> String {
        detail(&[
            ("ID", self.id.to_string()),
            ("Fecha", self.sale_date.format("%d/%m/%Y").to_string()),
            ("Auto", format!("{} (#{})", self.car, self.car_id)),
            ("Cliente", format!("{} (#{})", self.customer, self.customer_id)),
            ("Monto", self.amount.clone()),
            ("Método de pago", self.payment_method.clone()),
        ])
    }
}

impl Render for PrintersDto {
    fn render(&self) -> String {
        if self.printers.is_empty() {
            return "No se encontraron impresoras\n".to_string();
        }
        self.printers
            .iter()
            .map(|name| {
                let is_default = self.default_printer.as_deref() == Some(name.as_str());
                let marker = if is_default { "*" } else { " " };
                format!("{} {}\n", marker, name)
            })
            .collect()
    }
}
