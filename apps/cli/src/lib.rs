//! # AutoGest CLI Library
//!
//! Command-line front end for the AutoGest dealership back office.
//!
//! ## Module Organization
//! ```text
//! autogest_cli/
//! ├── lib.rs          ◄─── You are here (argument parsing & run)
//! ├── config.rs       ◄─── Environment configuration
//! ├── context.rs      ◄─── AppContext (database, images, reports, printer)
//! ├── commands/
//! │   ├── car.rs      ◄─── Inventory and photos
//! │   ├── customer.rs ◄─── Customers
//! │   ├── sale.rs     ◄─── Sales and receipts
//! │   └── printer.rs  ◄─── Printers, open and print
//! ├── output.rs       ◄─── Tables and --json
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## Usage
//! ```text
//! autogest car add --make Toyota --model Corolla --year 2020 --price 18500 \
//!     --color Blanco --transmission Manual --fuel Gasolina --image corolla.jpg
//! autogest car report 1 --print --copies 2
//! autogest customer search ana
//! autogest --json sale list
//! autogest sale receipt 3 --open
//! ```

pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod output;

use autogest_core::validation::{CarForm, CustomerForm, SaleForm};
use autogest_media::ImageSize;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use commands::printer::Delivery;
use commands::{car, customer, printer, sale};
use config::AppConfig;
use context::AppContext;
use output::{emit, emit_message};

// =============================================================================
// Arguments
// =============================================================================

/// AutoGest - vehicle dealership management.
#[derive(Parser, Debug)]
#[command(name = "autogest")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage the car inventory
    #[command(subcommand)]
    Car(CarCommand),

    /// Manage customers
    #[command(subcommand)]
    Customer(CustomerCommand),

    /// Register and review sales
    #[command(subcommand)]
    Sale(SaleCommand),

    /// Printers and generated documents
    #[command(subcommand)]
    Printers(PrinterCommand),
}

/// Subcommands for `autogest car`
#[derive(Subcommand, Debug)]
pub enum CarCommand {
    /// List every car
    List {
        /// Also check which photos can be loaded
        #[arg(long)]
        thumbnails: bool,
    },
    /// Show one car
    Show { id: i64 },
    /// Search by make, model or color
    Search { criterion: String },
    /// Register a car
    Add {
        #[command(flatten)]
        fields: CarFields,
        /// Photo to upload
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Change a car; omitted fields keep their value
    Edit {
        id: i64,
        #[command(flatten)]
        fields: CarFields,
        /// New photo, replacing the current one
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Delete a car that has no sales
    Delete { id: i64 },
    /// Generate the technical sheet
    Report {
        id: i64,
        #[command(flatten)]
        delivery: DeliveryArgs,
    },
    /// Save the thumbnail of a car photo
    Thumbnail {
        id: i64,
        /// Output image file (format from the extension)
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..))]
        width: u32,
        #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..))]
        height: u32,
    },
}

/// Car form fields. All optional so `edit` can merge them.
#[derive(Args, Debug, Default)]
pub struct CarFields {
    #[arg(long)]
    pub make: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub year: Option<String>,
    #[arg(long)]
    pub price: Option<String>,
    #[arg(long)]
    pub color: Option<String>,
    /// Manual or Automática
    #[arg(long)]
    pub transmission: Option<String>,
    /// Gasolina, Diésel, Eléctrico or Híbrido
    #[arg(long)]
    pub fuel: Option<String>,
}

impl CarFields {
    /// Overwrites the fields of `form` that were given.
    pub fn apply(self, mut form: CarForm) -> CarForm {
        merge(&mut form.make, self.make);
        merge(&mut form.model, self.model);
        merge(&mut form.year, self.year);
        merge(&mut form.price, self.price);
        merge(&mut form.color, self.color);
        merge(&mut form.transmission, self.transmission);
        merge(&mut form.fuel, self.fuel);
        form
    }
}

/// Subcommands for `autogest customer`
#[derive(Subcommand, Debug)]
pub enum CustomerCommand {
    /// List every customer
    List,
    /// Show one customer
    Show { id: i64 },
    /// Search by name, phone or email
    Search { criterion: String },
    /// Register a customer
    Add {
        #[command(flatten)]
        fields: CustomerFields,
    },
    /// Change a customer; omitted fields keep their value, empty ones clear it
    Edit {
        id: i64,
        #[command(flatten)]
        fields: CustomerFields,
    },
    /// Delete a customer that has no sales
    Delete { id: i64 },
    /// Generate the customer list
    Report {
        #[command(flatten)]
        delivery: DeliveryArgs,
    },
}

#[derive(Args, Debug, Default)]
pub struct CustomerFields {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
}

impl CustomerFields {
    /// Overwrites the fields of `form` that were given.
    pub fn apply(self, mut form: CustomerForm) -> CustomerForm {
        merge(&mut form.name, self.name);
        merge(&mut form.phone, self.phone);
        merge(&mut form.email, self.email);
        merge(&mut form.address, self.address);
        form
    }
}

/// Subcommands for `autogest sale`
#[derive(Subcommand, Debug)]
pub enum SaleCommand {
    /// List every sale
    List,
    /// Show one sale
    Show { id: i64 },
    /// Search by customer name, car make or model
    Search { criterion: String },
    /// Register a sale
    Add {
        #[arg(long)]
        car: String,
        #[arg(long)]
        customer: String,
        #[arg(long)]
        amount: String,
        /// Efectivo, Tarjeta or Transferencia
        #[arg(long, default_value = "Efectivo")]
        payment: String,
        /// YYYY-MM-DD, today when omitted
        #[arg(long)]
        date: Option<String>,
    },
    /// Delete a sale
    Delete { id: i64 },
    /// Generate the sale receipt
    Receipt {
        id: i64,
        #[command(flatten)]
        delivery: DeliveryArgs,
    },
}

/// Subcommands for `autogest printers`
#[derive(Subcommand, Debug)]
pub enum PrinterCommand {
    /// List installed printers (* marks the default)
    List,
    /// Open a document in the system viewer
    Open { path: PathBuf },
    /// Print a document
    Print {
        path: PathBuf,
        #[arg(long)]
        printer: Option<String>,
        #[arg(long, default_value_t = 1)]
        copies: u32,
    },
}

/// What to do with a generated document.
#[derive(Args, Debug, Default)]
pub struct DeliveryArgs {
    /// Open the document when it is ready
    #[arg(long)]
    pub open: bool,
    /// Print the document when it is ready
    #[arg(long)]
    pub print: bool,
    /// Printer to use instead of the default
    #[arg(long, requires = "print")]
    pub printer: Option<String>,
    #[arg(long, default_value_t = 1, requires = "print")]
    pub copies: u32,
}

impl From<DeliveryArgs> for Delivery {
    fn from(args: DeliveryArgs) -> Self {
        Delivery {
            open: args.open,
            print: args.print,
            printer: args.printer,
            copies: args.copies,
        }
    }
}

fn merge(slot: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *slot = value;
    }
}

// =============================================================================
// Entry Point
// =============================================================================

/// Runs the CLI.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Application Startup                               │
/// │                                                                         │
/// │  1. Read .env (if present) and parse arguments                          │
/// │  2. Initialize logging (stderr, RUST_LOG overrides the default)         │
/// │  3. Load AppConfig from the environment                                 │
/// │  4. Open the database, creating the schema on first run                 │
/// │  5. Run one command, print its result                                   │
/// │  6. Close the database                                                  │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_tracing();

    let config = AppConfig::load()?;
    info!(database = %config.database_path.display(), "Starting AutoGest");

    let ctx = AppContext::open(config).await?;
    let json = cli.json;
    let result = dispatch(&ctx, cli.command, json).await;
    ctx.close().await;

    if let Err(e) = &result {
        if json {
            if let Some(api) = e.downcast_ref::<error::ApiError>() {
                eprintln!("{}", serde_json::to_string_pretty(api)?);
            }
        }
    }
    result
}

/// Initializes the tracing subscriber on stderr.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=autogest=trace` - Trace for AutoGest crates only
/// - Default: INFO, DEBUG for AutoGest crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,autogest=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn dispatch(ctx: &AppContext, command: Commands, json: bool) -> anyhow::Result<()> {
    match command {
        Commands::Car(cmd) => run_car(ctx, cmd, json).await,
        Commands::Customer(cmd) => run_customer(ctx, cmd, json).await,
        Commands::Sale(cmd) => run_sale(ctx, cmd, json).await,
        Commands::Printers(cmd) => run_printers(ctx, cmd, json).await,
    }
}

async fn run_car(ctx: &AppContext, cmd: CarCommand, json: bool) -> anyhow::Result<()> {
    match cmd {
        CarCommand::List { thumbnails } => {
            let cars = car::list_cars(ctx).await?;
            emit(&cars, json)?;
            if thumbnails && !json {
                let available = car::thumbnail_availability(ctx, &cars, ImageSize::default()).await;
                for (car, ok) in cars.iter().zip(available) {
                    if car.image_url.is_some() {
                        let status = if ok { "disponible" } else { "no disponible" };
                        println!("#{} foto {}", car.id, status);
                    }
                }
            }
        }
        CarCommand::Show { id } => emit(&car::get_car(ctx, id).await?, json)?,
        CarCommand::Search { criterion } => emit(&car::search_cars(ctx, &criterion).await?, json)?,
        CarCommand::Add { fields, image } => {
            let form = fields.apply(CarForm::default());
            emit(&car::create_car(ctx, form, image.as_deref()).await?, json)?;
        }
        CarCommand::Edit { id, fields, image } => {
            let form = fields.apply(car::edit_form(ctx, id).await?);
            emit(&car::update_car(ctx, id, form, image.as_deref()).await?, json)?;
        }
        CarCommand::Delete { id } => {
            car::delete_car(ctx, id).await?;
            emit_message(&format!("Auto {} eliminado", id), json)?;
        }
        CarCommand::Report { id, delivery } => {
            let path = car::car_report(ctx, id).await?;
            finish_document(ctx, &path, delivery.into(), json).await?;
        }
        CarCommand::Thumbnail { id, out, width, height } => {
            match car::car_thumbnail(ctx, id, ImageSize::new(width, height)).await? {
                Some(image) => {
                    image.save(&out)?;
                    emit_message(&format!("Miniatura guardada en {}", out.display()), json)?;
                }
                None => anyhow::bail!("Car {} has no photo that could be loaded", id),
            }
        }
    }
    Ok(())
}

async fn run_customer(ctx: &AppContext, cmd: CustomerCommand, json: bool) -> anyhow::Result<()> {
    match cmd {
        CustomerCommand::List => emit(&customer::list_customers(ctx).await?, json)?,
        CustomerCommand::Show { id } => emit(&customer::get_customer(ctx, id).await?, json)?,
        CustomerCommand::Search { criterion } => {
            emit(&customer::search_customers(ctx, &criterion).await?, json)?
        }
        CustomerCommand::Add { fields } => {
            let form = fields.apply(CustomerForm::default());
            emit(&customer::create_customer(ctx, form).await?, json)?;
        }
        CustomerCommand::Edit { id, fields } => {
            let form = fields.apply(customer::edit_form(ctx, id).await?);
            emit(&customer::update_customer(ctx, id, form).await?, json)?;
        }
        CustomerCommand::Delete { id } => {
            customer::delete_customer(ctx, id).await?;
            emit_message(&format!("Cliente {} eliminado", id), json)?;
        }
        CustomerCommand::Report { delivery } => {
            let path = customer::customer_report(ctx).await?;
            finish_document(ctx, &path, delivery.into(), json).await?;
        }
    }
    Ok(())
}

async fn run_sale(ctx: &AppContext, cmd: SaleCommand, json: bool) -> anyhow::Result<()> {
    match cmd {
        SaleCommand::List => emit(&sale::list_sales(ctx).await?, json)?,
        SaleCommand::Show { id } => emit(&sale::get_sale(ctx, id).await?, json)?,
        SaleCommand::Search { criterion } => {
            emit(&sale::search_sales(ctx, &criterion).await?, json)?
        }
        SaleCommand::Add {
            car,
            customer,
            amount,
            payment,
            date,
        } => {
            let form = SaleForm {
                car_id: car,
                customer_id: customer,
                amount,
                payment_method: payment,
                sale_date: date.unwrap_or_else(sale::today),
            };
            emit(&sale::create_sale(ctx, form).await?, json)?;
        }
        SaleCommand::Delete { id } => {
            sale::delete_sale(ctx, id).await?;
            emit_message(&format!("Venta {} eliminada", id), json)?;
        }
        SaleCommand::Receipt { id, delivery } => {
            let path = sale::sale_receipt(ctx, id).await?;
            finish_document(ctx, &path, delivery.into(), json).await?;
        }
    }
    Ok(())
}

async fn run_printers(ctx: &AppContext, cmd: PrinterCommand, json: bool) -> anyhow::Result<()> {
    match cmd {
        PrinterCommand::List => emit(&printer::list_printers(ctx).await?, json)?,
        PrinterCommand::Open { path } => printer::open_document(ctx, &path).await?,
        PrinterCommand::Print {
            path,
            printer: name,
            copies,
        } => {
            printer::print_document(ctx, &path, name.as_deref(), copies).await?;
            emit_message(&format!("{} enviado a la impresora", path.display()), json)?;
        }
    }
    Ok(())
}

/// Reports where a document was written, then opens or prints it.
///
/// The document stays on disk when delivery fails, so that failure is a
/// warning rather than an error.
async fn finish_document(
    ctx: &AppContext,
    path: &Path,
    delivery: Delivery,
    json: bool,
) -> anyhow::Result<()> {
    emit_message(&format!("Documento generado: {}", path.display()), json)?;

    if let Err(e) = printer::deliver(ctx, path, &delivery).await {
        warn!(
            path = %path.display(),
            error = %e,
            "Document was generated but could not be delivered"
        );
        eprintln!("Aviso: {}", e.message);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_car_add() {
        let cli = Cli::parse_from([
            "autogest", "car", "add", "--make", "Toyota", "--model", "Corolla", "--year", "2020",
            "--price", "18500", "--color", "Blanco", "--transmission", "Manual", "--fuel",
            "Gasolina", "--image", "corolla.jpg",
        ]);

        match cli.command {
            Commands::Car(CarCommand::Add { fields, image }) => {
                let form = fields.apply(CarForm::default());
                assert_eq!(form.make, "Toyota");
                assert_eq!(form.fuel, "Gasolina");
                assert_eq!(image, Some(PathBuf::from("corolla.jpg")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_edit_merges_only_given_fields() {
        let current = CarForm {
            make: "Toyota".to_string(),
            model: "Corolla".to_string(),
            year: "2020".to_string(),
            price: "18500.00".to_string(),
            color: "Blanco".to_string(),
            transmission: "Manual".to_string(),
            fuel: "Gasolina".to_string(),
        };
        let fields = CarFields {
            color: Some("Rojo".to_string()),
            ..Default::default()
        };

        let merged = fields.apply(current.clone());
        assert_eq!(merged.color, "Rojo");
        assert_eq!(merged.make, current.make);
        assert_eq!(merged.price, current.price);
    }

    #[test]
    fn test_json_flag_is_global() {
        let cli = Cli::parse_from(["autogest", "sale", "list", "--json"]);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Sale(SaleCommand::List)));
    }

    #[test]
    fn test_receipt_delivery_flags() {
        let cli = Cli::parse_from([
            "autogest", "sale", "receipt", "3", "--print", "--printer", "HP", "--copies", "2",
        ]);
        match cli.command {
            Commands::Sale(SaleCommand::Receipt { id, delivery }) => {
                let delivery = Delivery::from(delivery);
                assert_eq!(id, 3);
                assert!(delivery.print && !delivery.open);
                assert_eq!(delivery.printer.as_deref(), Some("HP"));
                assert_eq!(delivery.copies, 2);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_printer_requires_print() {
        let args = ["autogest", "customer", "report", "--printer", "HP"];
        assert!(Cli::try_parse_from(args).is_err());
    }
    #[test]
    fn test_thumbnail_size_must_be_positive() {
        let base = ["autogest", "car", "thumbnail", "1", "--out", "foto.png"];

        for flag in ["--width", "--height"] {
            let args = base.iter().copied().chain([flag, "0"]);
            assert!(Cli::try_parse_from(args).is_err());
        }

        let cli = Cli::try_parse_from(base.iter().copied().chain(["--width", "120"])).unwrap();
        match cli.command {
            Commands::Car(CarCommand::Thumbnail { width, height, .. }) => {
                assert_eq!((width, height), (120, 50))
            }
            _ => panic!("expected car thumbnail"),
        }
    }
}
