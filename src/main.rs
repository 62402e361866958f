use catering_orders::application::cart::CartService;
use catering_orders::application::orders::{OrderService, PlaceOrder, SettlementRow};
use catering_orders::config::{self, GatewayConfig, PaymentSettings};
use catering_orders::domain::cart::{MenuItemId, MenuItemSnapshot};
use catering_orders::domain::money::Amount;
use catering_orders::domain::notification::CustomerProfile;
use catering_orders::domain::order::{Address, GeoPoint, LedgerSummary, OrderId, OrderType};
use catering_orders::domain::ports::{SharedClock, SharedNotifier, SharedPaymentGateway, Stores};
use catering_orders::domain::role::{Principal, Role, UserId};
use catering_orders::error::{GatewayError, OrderError};
use catering_orders::infrastructure::chapa::{ChapaGateway, UnconfiguredGateway};
use catering_orders::infrastructure::clock::SystemClock;
use catering_orders::infrastructure::log_notifier::LogNotifier;
use catering_orders::interfaces::csv::ledger_writer::LedgerWriter;
use catering_orders::interfaces::csv::settlement_reader::SettlementReader;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about = "Catering order lifecycle and payment ledger", long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(flatten)]
    payment: PaymentArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct PaymentArgs {
    /// Currency orders are charged in.
    #[arg(long, env = "CATERING_CURRENCY", default_value = config::DEFAULT_CURRENCY, global = true)]
    currency: String,

    /// URL the gateway calls back when a payment settles.
    #[arg(
        long,
        env = "CATERING_CALLBACK_URL",
        default_value = "http://localhost:8080/api/payments/callback",
        global = true
    )]
    callback_url: String,

    /// URL the customer is sent back to after checkout.
    #[arg(
        long,
        env = "CATERING_RETURN_URL",
        default_value = "http://localhost:3000/orders",
        global = true
    )]
    return_url: String,

    /// Upper bound on a single gateway call, in seconds (clamped to 10..=30).
    #[arg(long, env = "CATERING_GATEWAY_TIMEOUT_SECS", default_value_t = 20, global = true)]
    gateway_timeout_secs: u64,

    #[arg(long, env = "CHAPA_BASE_URL", default_value = config::DEFAULT_GATEWAY_URL, global = true)]
    gateway_url: String,

    #[arg(long, env = "CHAPA_SECRET_KEY", hide_env_values = true, global = true)]
    gateway_secret: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Manage customer contact profiles.
    #[command(subcommand)]
    Customer(CustomerCommand),
    /// Inspect or fill a customer's cart.
    #[command(subcommand)]
    Cart(CartCommand),
    /// Turn a customer's cart into an order and start the deposit payment.
    Place {
        #[arg(long)]
        customer: String,
        #[arg(long)]
        address: Option<String>,
        #[arg(long, requires = "lng")]
        lat: Option<f64>,
        #[arg(long, requires = "lat")]
        lng: Option<f64>,
        /// RFC 3339 timestamp, e.g. 2026-11-20T12:00:00Z
        #[arg(long)]
        delivery_date: Option<DateTime<Utc>>,
        #[arg(long = "type")]
        order_type: Option<String>,
    },
    /// Move an order to a new status.
    Status {
        #[arg(long)]
        order: OrderId,
        #[arg(long)]
        to: String,
        #[arg(long)]
        staff: String,
        #[arg(long, value_enum, default_value_t = StaffRole::Chef)]
        role: StaffRole,
    },
    /// Verify a gateway transaction and record it against its order.
    Confirm {
        #[arg(long)]
        tx_ref: String,
    },
    /// Assign an order to a chef.
    Assign {
        #[arg(long)]
        order: OrderId,
        #[arg(long)]
        chef: String,
        #[arg(long)]
        date: DateTime<Utc>,
        #[arg(long)]
        manager: String,
    },
    /// Print an order as JSON.
    Show {
        #[arg(long)]
        order: OrderId,
    },
    /// Print a customer's orders as ledger CSV.
    List {
        #[arg(long)]
        customer: String,
    },
    /// Apply a gateway settlement CSV (tx_ref, amount, method).
    Reconcile { input: PathBuf },
}

#[derive(Subcommand)]
enum CustomerCommand {
    Add {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
    },
}

#[derive(Subcommand)]
enum CartCommand {
    Add {
        #[arg(long)]
        customer: String,
        #[arg(long)]
        item: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: Decimal,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
        #[arg(long)]
        note: Option<String>,
    },
    Show {
        #[arg(long)]
        customer: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StaffRole {
    Chef,
    CateringManager,
}

impl From<StaffRole> for Role {
    fn from(role: StaffRole) -> Self {
        match role {
            StaffRole::Chef => Role::Chef,
            StaffRole::CateringManager => Role::CateringManager,
        }
    }
}

fn setup_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = catering_orders::infrastructure::rocksdb::RocksDBStore::open(path)
                .map_err(surface)?;
            Ok(store.into_stores())
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Stores::in_memory())
        }
        None => Ok(Stores::in_memory()),
    }
}

fn build_gateway(args: &PaymentArgs) -> Result<SharedPaymentGateway> {
    let config = GatewayConfig {
        base_url: args.gateway_url.clone(),
        secret_key: args.gateway_secret.clone(),
        timeout: config::clamp_timeout(Duration::from_secs(args.gateway_timeout_secs)),
    };
    match ChapaGateway::new(&config) {
        Ok(gateway) => Ok(Arc::new(gateway)),
        Err(GatewayError::NotConfigured) => {
            tracing::warn!("CHAPA_SECRET_KEY not set, payment requests will fail");
            Ok(Arc::new(UnconfiguredGateway))
        }
        Err(e) => Err(e).into_diagnostic(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    let stores = open_stores(cli.db_path)?;
    let clock: SharedClock = Arc::new(SystemClock);
    let notifier: SharedNotifier = Arc::new(LogNotifier);
    let gateway = build_gateway(&cli.payment)?;
    let settings = PaymentSettings::new(
        cli.payment.currency,
        cli.payment.callback_url,
        cli.payment.return_url,
        Duration::from_secs(cli.payment.gateway_timeout_secs),
    );

    let carts = CartService::new(stores.carts.clone(), clock.clone());
    let customers = stores.customers.clone();
    let service = OrderService::new(stores, gateway, notifier, clock, settings);

    match cli.command {
        Command::Customer(CustomerCommand::Add {
            id,
            name,
            email,
            phone,
        }) => {
            customers
                .upsert(CustomerProfile {
                    id: UserId::new(id),
                    name,
                    email,
                    phone,
                })
                .await
                .map_err(surface)?;
        }
        Command::Cart(CartCommand::Add {
            customer,
            item,
            name,
            price,
            quantity,
            note,
        }) => {
            let snapshot = MenuItemSnapshot {
                id: MenuItemId::new(item),
                name,
                unit_price: Amount::new(price).map_err(surface)?,
            };
            let cart = carts
                .add_item(&UserId::new(customer), snapshot, quantity, note)
                .await
                .map_err(surface)?;
            println!("subtotal={}", cart.subtotal);
        }
        Command::Cart(CartCommand::Show { customer }) => {
            let cart = carts.view(&UserId::new(customer)).await.map_err(surface)?;
            println!("{}", serde_json::to_string_pretty(&cart).into_diagnostic()?);
        }
        Command::Place {
            customer,
            address,
            lat,
            lng,
            delivery_date,
            order_type,
        } => {
            let order_type = order_type
                .map(|raw| raw.parse::<OrderType>())
                .transpose()
                .map_err(surface)?;
            let location = lat.zip(lng).map(|(lat, lng)| GeoPoint { lat, lng });
            let request = PlaceOrder {
                address: address.map(|text| Address { text, location }),
                delivery_date,
                order_type,
            };
            let principal = Principal::new(customer, Role::Customer);
            let placed = service
                .place_order(&principal, request)
                .await
                .map_err(surface)?;
            println!("order={}", placed.order.id);
            println!("deposit={}", placed.deposit);
            println!("tx_ref={}", placed.tx_ref);
            println!("checkout_url={}", placed.checkout_url);
        }
        Command::Status {
            order,
            to,
            staff,
            role,
        } => {
            let principal = Principal::new(staff, role.into());
            let update = service
                .update_status(&principal, order, &to)
                .await
                .map_err(surface)?;
            println!("status={}", update.order.order_status);
            println!("final_payment={:?}", update.final_payment);
        }
        Command::Confirm { tx_ref } => {
            let receipt = service.confirm_checkout(&tx_ref).await.map_err(surface)?;
            print_summaries(vec![receipt.order.ledger_summary()])?;
        }
        Command::Assign {
            order,
            chef,
            date,
            manager,
        } => {
            let principal = Principal::new(manager, Role::CateringManager);
            let schedule = service
                .assign_schedule(&principal, order, UserId::new(chef), date)
                .await
                .map_err(surface)?;
            println!("{}", serde_json::to_string_pretty(&schedule).into_diagnostic()?);
        }
        Command::Show { order } => {
            let order = service.get_order(order).await.map_err(surface)?;
            println!("{}", serde_json::to_string_pretty(&order).into_diagnostic()?);
        }
        Command::List { customer } => {
            let orders = service
                .orders_for_customer(&UserId::new(customer))
                .await
                .map_err(surface)?;
            print_summaries(orders.iter().map(|order| order.ledger_summary()).collect())?;
        }
        Command::Reconcile { input } => {
            let file = File::open(input).into_diagnostic()?;
            let mut rows: Vec<SettlementRow> = Vec::new();
            for row in SettlementReader::new(file).rows() {
                match row {
                    Ok(row) => rows.push(row),
                    Err(e) => eprintln!("Error processing settlement row: {}", e),
                }
            }

            let report = service.reconcile_settlement(rows).await;
            for (tx_ref, e) in &report.failures {
                eprintln!(
                    "Error processing settlement row: {}: {}",
                    tx_ref,
                    e.public_message()
                );
            }
            print_summaries(
                report
                    .touched_orders()
                    .into_iter()
                    .map(|order| order.ledger_summary())
                    .collect(),
            )?;
        }
    }

    Ok(())
}

/// Logs the full error and returns only what is safe to show the user.
fn surface(err: OrderError) -> miette::Report {
    if err.is_client_error() {
        tracing::debug!(error = %err, "request rejected");
    } else {
        tracing::error!(error = %err, "request failed");
    }
    miette::miette!("{}", err.public_message())
}

fn print_summaries(summaries: Vec<LedgerSummary>) -> Result<()> {
    let stdout = io::stdout();
    let mut writer = LedgerWriter::new(stdout.lock());
    writer.write_summaries(summaries).map_err(surface)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_hides_internal_detail() {
        let report = surface(OrderError::internal("expected value at line 1 column 1"));
        assert_eq!(report.to_string(), "Internal error");
    }

    #[test]
    fn test_surface_keeps_client_messages() {
        let report = surface(OrderError::InvalidStatus("shipped".into()));
        assert_eq!(report.to_string(), "Invalid order status: shipped");
    }
}
