//! # Demo Session Seeder
//!
//! Populates a local catalog and plays one full register session against it:
//! open, a weighed cart sale, a delivery sale, a manual entry, a cancel, close.
//!
//! ## Usage
//! ```bash
//! # Use caixa.toml / CAIXA_DB_PATH / defaults
//! cargo run -p caixa-db --bin seed
//!
//! # Specify database path
//! cargo run -p caixa-db --bin seed -- --db ./data/caixa.db
//!
//! # Count a specific closing amount (centavos)
//! cargo run -p caixa-db --bin seed -- --counted 15000
//!
//! # Print the close report as JSON for reporting tools
//! cargo run -p caixa-db --bin seed -- --json
//! ```

use std::env;
use std::path::PathBuf;

use caixa_core::{
    Cart, CartDiscount, Channel, DiscountRate, EntryType, Money, NewEntry, PaymentMethod,
    SaleSubmission, Weight, WeightReading, WeightSensor, DEFAULT_TENANT_ID,
};
use caixa_db::repository::product::new_product;
use caixa_db::{CaixaConfig, CashRegister, Database, ScaleReader};
use chrono::{Duration as ChronoDuration, Utc};

/// Demo catalog: (name, sold by weight, unit price or price per kg).
const CATALOG: &[(&str, bool, i64)] = &[
    ("Queijo minas", true, 5_000),
    ("Presunto", true, 4_200),
    ("Pao frances", true, 1_600),
    ("Agua 500ml", false, 350),
    ("Refrigerante 2L", false, 1_099),
    ("Cafe 500g", false, 1_890),
];

/// Scale stand-in that always reports the same recent reading.
struct DemoScale {
    grams: i64,
    age: ChronoDuration,
}

impl WeightSensor for DemoScale {
    fn read(&self) -> Option<WeightReading> {
        Some(WeightReading::new(
            Weight::from_grams(self.grams),
            Utc::now() - self.age,
        ))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    caixa_db::init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut counted_cents: Option<i64> = None;
    let mut as_json = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--counted" | "-c" => {
                if i + 1 < args.len() {
                    counted_cents = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--json" => as_json = true,
            "--help" | "-h" => {
                println!("Caixa Demo Session Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (default: from caixa.toml)");
                println!("  -c, --counted <CENTS>  Counted closing amount (default: expected)");
                println!("      --json             Print the close report as JSON");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = CaixaConfig::load(None)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    println!("Caixa Demo Session Seeder");
    println!("=========================");
    println!("Database: {}", config.database.path.display());
    println!();

    let db = Database::new(config.db_config()).await?;
    let register = CashRegister::from_config(db.clone(), &config);

    if let Some(open) = register.current_register().await? {
        println!("A register is already open ({})", open.id);
        println!("  Close it before seeding another session.");
        return Ok(());
    }

    // Catalog
    let products = db.products();
    let mut catalog = Vec::new();
    for (name, is_weighable, price_cents) in CATALOG {
        let product = new_product(DEFAULT_TENANT_ID, name, *is_weighable, *price_cents);
        catalog.push(products.insert(&product).await?);
    }
    println!("✓ Inserted {} products", catalog.len());

    // Session
    let session = register.open_register(Money::from_cents(10_000)).await?;
    println!("✓ Opened register {} with {}", session.id, session.opening_amount());

    let scale = ScaleReader::from_config(
        DemoScale {
            grams: 350,
            age: ChronoDuration::milliseconds(200),
        },
        &config,
    );
    let mut cart = Cart::new();
    for product in &catalog {
        if product.is_weighable {
            if let Some(weight) = scale.read_weight() {
                cart.add_item(product, 1, Some(weight))?;
            }
        } else {
            cart.add_item(product, 2, None)?;
        }
    }
    let checkout = cart.checkout(Some(CartDiscount::Percentage(DiscountRate::from_bps(500))))?;
    println!(
        "✓ Cart priced: {} lines, subtotal {}, discount {}, total {}",
        checkout.items.len(),
        checkout.subtotal,
        checkout.discount,
        checkout.total
    );

    let pos_sale = register
        .commit_sale(SaleSubmission::from_checkout(
            Channel::Pos,
            PaymentMethod::Cash,
            checkout,
        ))
        .await?;
    println!("✓ POS sale {} committed ({})", pos_sale.id, pos_sale.total());

    let mut delivery = Cart::new();
    if let Some(water) = catalog.iter().find(|p| !p.is_weighable) {
        delivery.add_item(water, 6, None)?;
    }
    let delivery_sale = register
        .commit_sale(SaleSubmission::from_checkout(
            Channel::Delivery,
            PaymentMethod::Pix,
            delivery.checkout(None)?,
        ))
        .await?;
    println!("✓ Delivery sale {} committed ({})", delivery_sale.id, delivery_sale.total());

    let voided = register
        .commit_sale(SaleSubmission::manual(Money::from_cents(990), PaymentMethod::Cash)?)
        .await?;
    register.cancel_sale(&voided.id).await?;
    println!("✓ Manual sale {} cancelled", voided.id);

    register
        .add_entry(
            &session.id,
            NewEntry {
                entry_type: EntryType::Expense,
                amount: Money::from_cents(1_500),
                description: "Compra de gelo".to_string(),
                payment_method: PaymentMethod::Cash,
            },
        )
        .await?;
    println!("✓ Recorded cash expense");

    let summary = register.get_summary(&session.id).await?;
    let counted = counted_cents
        .map(Money::from_cents)
        .unwrap_or(summary.expected_balance);

    let report = register.close_register(&session.id, counted).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        db.close().await;
        return Ok(());
    }

    println!();
    println!("Close report");
    println!("  Opening:          {}", report.summary.opening_amount);
    println!("  POS sales:        {}", report.summary.sales_total);
    println!("  Delivery sales:   {}", report.summary.delivery_total);
    println!("  Manual sales:     {}", report.summary.manual_total);
    println!("  Expenses:         {}", report.summary.total_expense);
    println!("  Cancelled:        {}", report.summary.cancelled_count);
    println!("  Expected drawer:  {}", report.summary.expected_balance);
    println!("  Counted:          {}", report.closing_amount());
    println!("  Difference:       {} ({:?})", report.difference, report.classification);
    for (method, amount) in &report.summary.payment_breakdown {
        println!("  {:<16}  {}", format!("{:?}:", method), amount);
    }

    db.close().await;
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
