//! # Documents
//!
//! The three printable documents and where they are written.
//!
//! | Document      | File name                          |
//! |---------------|------------------------------------|
//! | Car sheet     | `auto_{id}_{marca}_{modelo}.pdf`   |
//! | Customer list | `lista_clientes.pdf`               |
//! | Sale receipt  | `venta_{id}_comprobante.pdf`       |
//!
//! Names are deterministic, so generating a document again replaces the
//! previous copy.

use autogest_core::{Car, Customer, SaleDetail};
use chrono::{Local, NaiveDateTime};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ReportError, ReportResult};
use crate::layout::{Align, Column, Flow, CONTENT_WIDTH};
use crate::pdf::PdfImage;

const SUBTITLE: &str = "AutoGest - Sistema de Gestión de Venta de Autos";
const NOT_AVAILABLE: &str = "N/A";

/// File name of the customer list.
pub const CUSTOMER_LIST_FILE_NAME: &str = "lista_clientes.pdf";

/// Longest side of an embedded photo, in pixels.
const MAX_PHOTO_PIXELS: u32 = 800;

// =============================================================================
// Generator
// =============================================================================

/// Renders documents into one output directory.
///
/// ## Example
/// ```rust,ignore
/// let reports = ReportGenerator::new(config.report_dir.clone());
/// let path = reports.sale_receipt(&sale, None)?;
/// printer.open(&path).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl ReportGenerator {
    /// The directory is created on first write, not here.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        ReportGenerator {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes the technical sheet of one car.
    ///
    /// ## Arguments
    /// * `car` - The stored car
    /// * `photo` - Picture to print above the data table, if one was loaded
    pub fn car_sheet(&self, car: &Car, photo: Option<&DynamicImage>) -> ReportResult<PathBuf> {
        let bytes = render_car_sheet(car, photo, Local::now().naive_local());
        self.write(&car_sheet_file_name(car), &bytes)
    }

    /// Writes the list of all customers.
    pub fn customer_list(&self, customers: &[Customer]) -> ReportResult<PathBuf> {
        let bytes = render_customer_list(customers, Local::now().naive_local());
        self.write(CUSTOMER_LIST_FILE_NAME, &bytes)
    }

    /// Writes the receipt of one sale.
    pub fn sale_receipt(
        &self,
        sale: &SaleDetail,
        photo: Option<&DynamicImage>,
    ) -> ReportResult<PathBuf> {
        let bytes = render_sale_receipt(sale, photo, Local::now().naive_local());
        self.write(&sale_receipt_file_name(sale.id), &bytes)
    }

    fn write(&self, file_name: &str, bytes: &[u8]) -> ReportResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| ReportError::write(&self.output_dir, e))?;

        let path = self.output_dir.join(file_name);
        std::fs::write(&path, bytes).map_err(|e| ReportError::write(&path, e))?;

        info!(path = %path.display(), bytes = bytes.len(), "Document written");
        Ok(path)
    }
}

// =============================================================================
// File Names
// =============================================================================

/// `auto_{id}_{marca}_{modelo}.pdf`, slugged.
pub fn car_sheet_file_name(car: &Car) -> String {
    format!("{}.pdf", slug(&format!("auto_{}_{}_{}", car.id, car.make, car.model)))
}

/// `venta_{id}_comprobante.pdf`.
pub fn sale_receipt_file_name(sale_id: i64) -> String {
    format!("venta_{}_comprobante.pdf", sale_id)
}

/// Lowercase ASCII, with every run of other characters collapsed to `_`.
///
/// Spanish accents are folded to their base letter first, so
/// `"Citroën Año"` becomes `"citroen_ano"`.
pub fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_separator = false;

    for c in text.chars() {
        let c = match c {
            'á' | 'à' | 'â' | 'ä' | 'ã' | 'Á' | 'À' | 'Â' | 'Ä' | 'Ã' => 'a',
            'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
            'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' => 'o',
            'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
            'ñ' | 'Ñ' => 'n',
            'ç' | 'Ç' => 'c',
            other => other,
        };

        if c.is_ascii_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    out
}

// =============================================================================
// Rendering
// =============================================================================

fn or_not_available(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

fn footer(flow: &mut Flow, generated_at: NaiveDateTime) {
    flow.note(&format!(
        "Documento generado el {} a las {}",
        generated_at.format("%d/%m/%Y"),
        generated_at.format("%H:%M")
    ));
}

fn embeddable(photo: &DynamicImage) -> PdfImage {
    if photo.width() > MAX_PHOTO_PIXELS || photo.height() > MAX_PHOTO_PIXELS {
        PdfImage::from(&photo.thumbnail(MAX_PHOTO_PIXELS, MAX_PHOTO_PIXELS))
    } else {
        PdfImage::from(photo)
    }
}

pub(crate) fn render_car_sheet(
    car: &Car,
    photo: Option<&DynamicImage>,
    generated_at: NaiveDateTime,
) -> Vec<u8> {
    debug!(car_id = car.id, with_photo = photo.is_some(), "Rendering car sheet");

    let mut flow = Flow::new("FICHA TÉCNICA DEL VEHÍCULO");
    flow.title("FICHA TÉCNICA DEL VEHÍCULO");
    flow.subtitle(SUBTITLE);
    flow.spacer(20.0);

    if let Some(photo) = photo {
        flow.picture(embeddable(photo), 324.0, 216.0);
        flow.spacer(20.0);
    }

    flow.heading("Información del Vehículo");
    flow.field_table(&[
        ("Marca:", car.make.clone()),
        ("Modelo:", car.model.clone()),
        ("Año:", car.year.to_string()),
        ("Color:", car.color.clone()),
        ("Transmisión:", car.transmission.to_string()),
        ("Combustible:", car.fuel.to_string()),
        ("Precio:", car.price().to_string()),
    ]);
    flow.spacer(36.0);

    footer(&mut flow, generated_at);
    flow.finish()
}

pub(crate) fn render_customer_list(customers: &[Customer], generated_at: NaiveDateTime) -> Vec<u8> {
    debug!(count = customers.len(), "Rendering customer list");

    let mut flow = Flow::new("LISTA DE CLIENTES");
    flow.title("LISTA DE CLIENTES");
    flow.subtitle(SUBTITLE);
    flow.spacer(20.0);

    if customers.is_empty() {
        flow.paragraph("No hay clientes registrados");
    } else {
        flow.heading(&format!("Total de clientes: {}", customers.len()));

        let unit = CONTENT_WIDTH / 7.2;
        let columns = [
            Column { title: "ID", width: unit * 0.5, align: Align::Center },
            Column { title: "Nombre", width: unit * 1.8, align: Align::Left },
            Column { title: "Teléfono", width: unit * 1.3, align: Align::Left },
            Column { title: "Correo", width: unit * 1.8, align: Align::Left },
            Column { title: "Dirección", width: unit * 1.8, align: Align::Left },
        ];

        let rows: Vec<Vec<String>> = customers
            .iter()
            .map(|c| {
                vec![
                    c.id.to_string(),
                    c.name.clone(),
                    or_not_available(c.phone.as_deref()),
                    or_not_available(c.email.as_deref()),
                    or_not_available(c.address.as_deref()),
                ]
            })
            .collect();

        flow.grid_table(&columns, &rows);
    }

    flow.spacer(36.0);
    footer(&mut flow, generated_at);
    flow.finish()
}

pub(crate) fn render_sale_receipt(
    sale: &SaleDetail,
    photo: Option<&DynamicImage>,
    generated_at: NaiveDateTime,
) -> Vec<u8> {
    debug!(sale_id = sale.id, with_photo = photo.is_some(), "Rendering sale receipt");

    let mut flow = Flow::new("COMPROBANTE DE VENTA");
    flow.title("COMPROBANTE DE VENTA");
    flow.subtitle(SUBTITLE);
    flow.spacer(20.0);

    flow.heading("Datos de la Venta");
    flow.field_table(&[
        ("ID Venta:", sale.id.to_string()),
        ("Fecha:", sale.sale_date.format("%d/%m/%Y").to_string()),
        ("Método de Pago:", sale.payment_method.to_string()),
    ]);
    flow.spacer(14.0);

    flow.heading("Datos del Cliente");
    flow.field_table(&[
        ("Nombre:", sale.customer_name.clone()),
        ("Teléfono:", or_not_available(sale.customer_phone.as_deref())),
        ("Correo:", or_not_available(sale.customer_email.as_deref())),
        ("Dirección:", or_not_available(sale.customer_address.as_deref())),
    ]);
    flow.spacer(14.0);

    flow.heading("Datos del Vehículo");
    if let Some(photo) = photo {
        flow.picture(embeddable(photo), 252.0, 180.0);
        flow.spacer(14.0);
    }
    flow.field_table(&[
        ("Marca:", sale.car_make.clone()),
        ("Modelo:", sale.car_model.clone()),
        ("Año:", sale.car_year.to_string()),
        ("Color:", sale.car_color.clone()),
    ]);
    flow.spacer(22.0);

    flow.banner("MONTO TOTAL:", &sale.amount().to_string());
    flow.spacer(22.0);

    footer(&mut flow, generated_at);
    flow.finish()
}

// =============================================================================
// Unit Tests
// =============================================================================
