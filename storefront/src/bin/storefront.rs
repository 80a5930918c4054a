use clap::{Parser, Subcommand};
use common::api::{ModelId, OrderOut};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use storefront::cart::CartView;
use storefront::{ClientError, OrderAction, ServiceUrls, SessionStore, ShopClient, Storefront, order_actions};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "storefront", about = "MicroShop storefront")]
struct Cli {
    #[arg(long, env = "MICROSHOP_AUTH_URL", default_value = "http://localhost:8001")]
    auth_url: String,

    #[arg(long, env = "MICROSHOP_PRODUCT_URL", default_value = "http://localhost:8002")]
    product_url: String,

    #[arg(long, env = "MICROSHOP_ORDER_URL", default_value = "http://localhost:8003")]
    order_url: String,

    #[arg(long, env = "MICROSHOP_PAYMENT_URL", default_value = "http://localhost:8004")]
    payment_url: String,

    /// Where the token, cart and checkout draft are kept
    #[arg(long, env = "MICROSHOP_SESSION", default_value = ".microshop/session.json")]
    session: PathBuf,

    #[arg(long, default_value_t = 10)]
    timeout_seconds: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Register { email: String, password: String },
    Login { email: String, password: String },
    Logout,
    Me,
    Products,
    Cart {
        #[command(subcommand)]
        command: CartCommand,
    },
    Checkout,
    Orders,
    Order { id: ModelId },
    Pay {
        id: ModelId,
        #[arg(long)]
        address: String,
        #[arg(long)]
        phone: String,
    },
    Payments,
}

#[derive(Subcommand, Debug)]
enum CartCommand {
    Show,
    Add {
        product_id: ModelId,
        #[arg(default_value_t = 1)]
        qty: i64,
    },
    Set { product_id: ModelId, qty: String },
    Remove { product_id: ModelId },
    Clear,
}

fn print_order(order: &OrderOut) {
    println!("Order #{}  {}  total ${}", order.id, order.status, order.total);
    for item in &order.items {
        println!("  product {} x{} @ ${}", item.product_id, item.qty, item.unit_price);
    }
    if order_actions(order).contains(&OrderAction::GoToPayment) {
        println!("  -> storefront pay {} --address <address> --phone <phone>", order.id);
    }
}

fn print_cart(view: &CartView) {
    if view.lines.is_empty() {
        println!("Cart is empty");
        return;
    }
    for line in &view.lines {
        match (&line.name, line.line_total) {
            (Some(name), Some(total)) => println!("{:>4}  {} x{}  ${}", line.product_id, name, line.qty, total),
            _ => println!("{:>4}  (no longer available) x{}", line.product_id, line.qty),
        }
    }
    println!("Total: ${}", view.total);
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    let urls = ServiceUrls {
        auth: cli.auth_url,
        product: cli.product_url,
        order: cli.order_url,
        payment: cli.payment_url,
    };
    let client = ShopClient::new(urls, Duration::from_secs(cli.timeout_seconds))?;
    let mut shop = Storefront::new(client, SessionStore::open(cli.session)?);

    match cli.command {
        Command::Register { email, password } => {
            let user = shop.register(&email, &password).await?;
            println!("Registered {}. Check your inbox to verify the address.", user.email);
        }
        Command::Login { email, password } => {
            shop.login(&email, &password).await?;
            println!("Logged in");
        }
        Command::Logout => {
            shop.logout()?;
            println!("Logged out");
        }
        Command::Me => {
            let me = shop.me().await?;
            let verified = if me.is_verified { "verified" } else { "not verified" };
            println!("#{} {} ({}{})", me.id, me.email, verified, if me.is_admin { ", admin" } else { "" });
        }
        Command::Products => {
            for product in shop.products().await? {
                println!("{:>4}  {}  ${}", product.id, product.name, product.price);
            }
        }
        Command::Cart { command } => match command {
            CartCommand::Show => print_cart(&shop.cart_view().await?),
            CartCommand::Add { product_id, qty } => {
                shop.add_to_cart(product_id, qty)?;
                println!("Added product {}", product_id);
            }
            CartCommand::Set { product_id, qty } => {
                if !shop.set_cart_quantity(product_id, &qty)? {
                    return Err(ClientError::validation(format!("Product {} is not in the cart", product_id)));
                }
            }
            CartCommand::Remove { product_id } => {
                shop.remove_from_cart(product_id)?;
            }
            CartCommand::Clear => shop.clear_cart()?,
        },
        Command::Checkout => {
            let order = shop.checkout().await?;
            print_order(&order);
        }
        Command::Orders => {
            for order in shop.orders().await? {
                print_order(&order);
            }
        }
        Command::Order { id } => print_order(&shop.order(id).await?),
        Command::Pay { id, address, phone } => {
            let payment = shop.pay(id, &address, &phone).await?;
            println!("Payment #{} accepted for order #{}", payment.payment_id, id);
        }
        Command::Payments => {
            for payment in shop.payments().await? {
                println!("#{}  order #{}  ${}  {}", payment.id, payment.order_id, payment.amount, payment.status);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            if e.needs_login() {
                eprintln!("Run `storefront login <email> <password>`.");
            }
            ExitCode::FAILURE
        }
    }
}
