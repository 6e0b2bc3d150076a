//! Command-line interface over the storefront management client.
//!
//! Every invocation restores the persisted session first, then runs one
//! subcommand against it. Output is plain text for humans; pass `--json`
//! to get the raw server entities for scripting.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use storekeeper::api::auth::UserListParams;
use storekeeper::api::products::ProductListParams;
use storekeeper::api::stores::StoreListParams;
use storekeeper::config::Config;
use storekeeper::models::{
    price, CreatePlatformUser, CreateStore, CreateStoreWithOwner, LoginCredentials, PlatformRole,
    Product, ProductDraft, Store, StoreAccessGrant, StorePermissions, StoreRole, User,
};
use storekeeper::session::toggle::ToggleOutcome;
use storekeeper::session::{SessionContext, SessionError};
use storekeeper::storage::CredentialStore;

#[derive(Parser)]
#[command(name = "storekeeper", version, about = "Storefront management client")]
struct Cli {
    /// Emit raw JSON instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in to the platform and persist the session.
    Login(LoginArgs),
    /// Clear the persisted session.
    Logout,
    /// Show the current user and active store.
    Whoami,
    /// Exchange the current token for a fresh one.
    Refresh,
    /// Store operations.
    #[command(subcommand)]
    Stores(StoreCommand),
    /// Product operations against a store.
    #[command(subcommand)]
    Products(ProductCommand),
    /// Platform user administration.
    #[command(subcommand)]
    Users(UserCommand),
}

#[derive(Args)]
struct LoginArgs {
    /// Login email; defaults to the remembered one.
    #[arg(long)]
    email: Option<String>,
    /// Password; prompted for when omitted.
    #[arg(long)]
    password: Option<String>,
    /// Remember the email for the next login.
    #[arg(long)]
    remember: bool,
}

#[derive(Subcommand)]
enum StoreCommand {
    /// List the stores you can access.
    Mine,
    /// List all stores (admin).
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Show one store.
    Show { store_id: String },
    /// Select the active store for subsequent commands.
    Switch { store_id: String },
    /// Create a store, optionally bound to an owner account (admin).
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        client_email: String,
        /// Owner account to bind; omitted means a plain create.
        #[arg(long)]
        owner_id: Option<String>,
    },
    /// Flip a store's active flag.
    ToggleActive { store_id: String },
    /// Flip one collection flag on a store.
    ToggleCollection {
        store_id: String,
        collection_key: String,
    },
}

#[derive(Subcommand)]
enum ProductCommand {
    /// List products of the active store.
    List {
        /// Store slug; defaults to the active store.
        #[arg(long)]
        store: Option<String>,
        #[arg(long)]
        collection: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        /// Use the admin route, which also lists hidden products.
        #[arg(long)]
        all: bool,
    },
    /// Show one product.
    Show {
        product_id: String,
        #[arg(long)]
        store: Option<String>,
    },
    /// Create a product.
    Add {
        #[arg(long)]
        store: Option<String>,
        #[arg(long)]
        collection: String,
        #[arg(long)]
        name: String,
        /// Price in major units, e.g. 159.00.
        #[arg(long)]
        price: f64,
        /// Image URL; repeatable.
        #[arg(long = "image", required = true)]
        images: Vec<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Update fields of a product.
    Update {
        product_id: String,
        #[arg(long)]
        store: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        price: Option<f64>,
        #[arg(long)]
        discount: Option<u8>,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Delete a product.
    Delete {
        product_id: String,
        #[arg(long)]
        store: Option<String>,
    },
}

#[derive(Subcommand)]
enum UserCommand {
    /// List platform users (admin).
    List {
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Create a platform user (admin).
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// PLATFORM_ADMIN, STORE_OWNER, STORE_EMPLOYEE or DEFAULT_USER.
        #[arg(long, default_value = "STORE_EMPLOYEE")]
        role: String,
    },
    /// Grant a user access to a store (admin).
    Grant {
        user_id: String,
        store_id: String,
        /// OWNER, MANAGER, EMPLOYEE or VIEWER.
        #[arg(long, default_value = "EMPLOYEE")]
        role: String,
        #[arg(long)]
        manage_products: bool,
        #[arg(long)]
        manage_users: bool,
    },
    /// Revoke a user's access to a store (admin).
    Revoke { user_id: String, store_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load()?;
    let creds = CredentialStore::open_default()?;
    let ctx = SessionContext::new(config, creds)?;
    ctx.initialize().await.map_err(user_facing)?;

    match cli.command {
        Command::Login(args) => login(&ctx, args).await,
        Command::Logout => {
            ctx.logout().await;
            println!("Logged out.");
            Ok(())
        }
        Command::Whoami => whoami(&ctx, cli.json),
        Command::Refresh => {
            if ctx.refresh_auth_token().await {
                println!("Token refreshed.");
                Ok(())
            } else {
                bail!("Token refresh failed. Log in again if the problem persists.")
            }
        }
        Command::Stores(cmd) => stores(&ctx, cmd, cli.json).await,
        Command::Products(cmd) => products(&ctx, cmd, cli.json).await,
        Command::Users(cmd) => users(&ctx, cmd, cli.json).await,
    }
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "storekeeper=warn",
        1 => "storekeeper=debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Convert a session failure into the message shown to the user, keeping
/// the technical chain underneath for `-v` runs.
fn user_facing(err: SessionError) -> anyhow::Error {
    let shown = err.user_message();
    anyhow::Error::new(err).context(shown)
}

// ── Command handlers ─────────────────────────────────────────────

async fn login(ctx: &SessionContext, args: LoginArgs) -> Result<()> {
    let email = match args.email.or_else(|| ctx.remembered_email()) {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    let password = match args.password {
        Some(password) => password,
        None => prompt("Password: ")?,
    };

    ctx.login(
        &LoginCredentials {
            email,
            password,
        },
        args.remember,
    )
    .await
    .map_err(user_facing)?;

    let session = ctx.session();
    if let Some(user) = &session.user {
        println!("Logged in as {} ({:?}).", user.email, user.role);
    }
    if let Some(store) = &session.active_store {
        println!("Active store: {} ({}).", store.name, store.slug);
    }
    Ok(())
}

fn whoami(ctx: &SessionContext, json: bool) -> Result<()> {
    let session = ctx.session();
    let Some(user) = &session.user else {
        bail!("Not logged in.");
    };
    if json {
        println!("{}", serde_json::to_string_pretty(user)?);
        return Ok(());
    }
    print_user(user);
    match &session.active_store {
        Some(store) => println!("Active store: {} ({})", store.name, store.id),
        None => println!("Active store: none"),
    }
    if !session.all_stores.is_empty() {
        println!("Accessible stores:");
        for store in &session.all_stores {
            print_store_line(store);
        }
    }
    Ok(())
}

async fn stores(ctx: &SessionContext, cmd: StoreCommand, json: bool) -> Result<()> {
    let token = require_token(ctx)?;
    match cmd {
        StoreCommand::Mine => {
            ctx.refresh_store_data().await.map_err(user_facing)?;
            let session = ctx.session();
            if json {
                println!("{}", serde_json::to_string_pretty(&session.all_stores)?);
                return Ok(());
            }
            for store in &session.all_stores {
                print_store_line(store);
            }
            Ok(())
        }
        StoreCommand::List { page, search, active } => {
            let params = StoreListParams {
                page,
                search,
                is_active: active,
                ..Default::default()
            };
            let result = ctx.stores().list(&params, &token).await.map_err(api_facing)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
                return Ok(());
            }
            for store in &result.stores {
                print_store_line(store);
            }
            println!("Page {}/{} ({} total)", result.page, result.total_pages, result.total);
            Ok(())
        }
        StoreCommand::Show { store_id } => {
            let store = ctx.stores().get(&store_id, &token).await.map_err(api_facing)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&store)?);
                return Ok(());
            }
            print_store(&store);
            Ok(())
        }
        StoreCommand::Switch { store_id } => {
            ctx.switch_store(&store_id).await.map_err(user_facing)?;
            let store = ctx.session().active_store.context("no store selected")?;
            println!("Active store: {} ({})", store.name, store.slug);
            Ok(())
        }
        StoreCommand::Create { name, client_email, owner_id } => {
            match owner_id {
                Some(owner_id) => {
                    let created = ctx
                        .stores()
                        .create_with_owner(
                            &CreateStoreWithOwner {
                                name,
                                client_email,
                                owner_id,
                                collections: None,
                                settings: None,
                            },
                            &token,
                        )
                        .await
                        .map_err(api_facing)?;
                    println!(
                        "Created store {} ({}) owned by {}.",
                        created.store.name, created.store.id, created.owner.email
                    );
                }
                None => {
                    let created = ctx
                        .stores()
                        .create(
                            &CreateStore {
                                name,
                                client_email,
                                collections: None,
                                settings: None,
                            },
                            &token,
                        )
                        .await
                        .map_err(api_facing)?;
                    println!("Created store {} ({}).", created.name, created.id);
                }
            }
            Ok(())
        }
        StoreCommand::ToggleActive { store_id } => {
            match ctx.toggle_store_active(&store_id).await.map_err(user_facing)? {
                ToggleOutcome::Reconciled(store) => {
                    println!(
                        "Store {} is now {}.",
                        store.name,
                        if store.is_active { "active" } else { "inactive" }
                    );
                }
                ToggleOutcome::RolledBack { error, restored } => {
                    println!(
                        "Toggle rejected, store {} left {}: {}",
                        restored.name,
                        if restored.is_active { "active" } else { "inactive" },
                        error.user_message()
                    );
                }
            }
            Ok(())
        }
        StoreCommand::ToggleCollection { store_id, collection_key } => {
            let store = ctx
                .toggle_collection(&store_id, &collection_key)
                .await
                .map_err(user_facing)?;
            let enabled = store.collections.get(&collection_key).copied().unwrap_or(false);
            println!(
                "Collection {collection_key} on {} is now {}.",
                store.name,
                if enabled { "enabled" } else { "disabled" }
            );
            Ok(())
        }
    }
}

async fn products(ctx: &SessionContext, cmd: ProductCommand, json: bool) -> Result<()> {
    let token = require_token(ctx)?;
    let role = current_role(ctx)?;
    match cmd {
        ProductCommand::List { store, collection, search, page, all } => {
            let slug = resolve_store_slug(ctx, store)?;
            let params = ProductListParams {
                page,
                collection_key: collection,
                search,
                ..Default::default()
            };
            let result = if all {
                ctx.products()
                    .list_all(&slug, &params, &token)
                    .await
                    .map_err(api_facing)?
            } else {
                ctx.products()
                    .list(&slug, &params, Some(&token))
                    .await
                    .map_err(api_facing)?
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
                return Ok(());
            }
            for product in &result.products {
                print_product_line(product);
            }
            println!("Page {}/{} ({} total)", result.page, result.total_pages, result.total);
            Ok(())
        }
        ProductCommand::Show { product_id, store } => {
            let slug = resolve_store_slug(ctx, store)?;
            let product = ctx
                .products()
                .get(&slug, &product_id, Some(&token))
                .await
                .map_err(api_facing)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&product)?);
                return Ok(());
            }
            print_product(&product);
            Ok(())
        }
        ProductCommand::Add { store, collection, name, price: major, images, description } => {
            let slug = resolve_store_slug(ctx, store)?;
            require_manage(ctx, &slug)?;
            let draft = ProductDraft {
                collection_key: Some(collection),
                name: Some(name),
                price: Some(price::to_minor(major)),
                image_list: Some(images),
                description,
                ..Default::default()
            };
            let product = ctx
                .products()
                .create(&slug, &draft, &token, role)
                .await
                .map_err(api_facing)?;
            println!("Created product {} ({}).", product.name, product.id);
            Ok(())
        }
        ProductCommand::Update { product_id, store, name, price: major, discount, active } => {
            let slug = resolve_store_slug(ctx, store)?;
            require_manage(ctx, &slug)?;
            let draft = ProductDraft {
                name,
                price: major.map(price::to_minor),
                discount,
                is_active: active,
                ..Default::default()
            };
            let product = ctx
                .products()
                .update(&slug, &product_id, &draft, &token, role)
                .await
                .map_err(api_facing)?;
            println!("Updated product {} ({}).", product.name, product.id);
            Ok(())
        }
        ProductCommand::Delete { product_id, store } => {
            let slug = resolve_store_slug(ctx, store)?;
            require_manage(ctx, &slug)?;
            ctx.products()
                .delete(&slug, &product_id, &token, role)
                .await
                .map_err(api_facing)?;
            println!("Deleted product {product_id}.");
            Ok(())
        }
    }
}

async fn users(ctx: &SessionContext, cmd: UserCommand, json: bool) -> Result<()> {
    let token = require_token(ctx)?;
    match cmd {
        UserCommand::List { page, search } => {
            let params = UserListParams {
                page,
                search,
                ..Default::default()
            };
            let result = ctx.auth().list_users(&params, &token).await.map_err(api_facing)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
                return Ok(());
            }
            for user in &result.users {
                println!(
                    "{}  {}  {:?}  {}",
                    user.id,
                    user.email,
                    user.role,
                    if user.is_active { "active" } else { "inactive" }
                );
            }
            println!("Page {}/{} ({} total)", result.page, result.total_pages, result.total);
            Ok(())
        }
        UserCommand::Create { name, email, password, role } => {
            let created = ctx
                .auth()
                .create_user(
                    &CreatePlatformUser {
                        name,
                        email,
                        password,
                        role: parse_platform_role(&role)?,
                    },
                    &token,
                )
                .await
                .map_err(api_facing)?;
            println!("Created user {} ({}).", created.email, created.id);
            Ok(())
        }
        UserCommand::Grant { user_id, store_id, role, manage_products, manage_users } => {
            let grant = StoreAccessGrant {
                store_role: parse_store_role(&role)?,
                permissions: StorePermissions {
                    can_manage_products: manage_products,
                    can_manage_users: manage_users,
                    ..Default::default()
                },
            };
            let access = ctx
                .auth()
                .grant_store_access(&user_id, &store_id, &grant, &token)
                .await
                .map_err(api_facing)?;
            println!("Granted access to {} ({:?}).", access.store_name, grant.store_role);
            Ok(())
        }
        UserCommand::Revoke { user_id, store_id } => {
            ctx.auth()
                .revoke_store_access(&user_id, &store_id, &token)
                .await
                .map_err(api_facing)?;
            println!("Revoked access of {user_id} to store {store_id}.");
            Ok(())
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn api_facing(err: storekeeper::api::ApiError) -> anyhow::Error {
    user_facing(err.into())
}

fn require_token(ctx: &SessionContext) -> Result<String> {
    ctx.session()
        .token
        .context("Not logged in. Run `storekeeper login` first.")
}

fn current_role(ctx: &SessionContext) -> Result<PlatformRole> {
    ctx.session()
        .user
        .map(|u| u.role)
        .context("Not logged in. Run `storekeeper login` first.")
}

fn require_manage(ctx: &SessionContext, store_slug: &str) -> Result<()> {
    if !ctx.can_manage_store(store_slug) {
        bail!("You do not have management access to store {store_slug}.");
    }
    Ok(())
}

/// Explicit `--store` slug wins; otherwise the active store's slug.
fn resolve_store_slug(ctx: &SessionContext, explicit: Option<String>) -> Result<String> {
    if let Some(slug) = explicit {
        return Ok(slug);
    }
    ctx.session()
        .active_store
        .map(|s| s.slug)
        .context("No active store. Run `storekeeper stores switch <id>` or pass --store.")
}

fn parse_platform_role(raw: &str) -> Result<PlatformRole> {
    match raw.to_ascii_uppercase().as_str() {
        "PLATFORM_ADMIN" => Ok(PlatformRole::PlatformAdmin),
        "STORE_OWNER" => Ok(PlatformRole::StoreOwner),
        "STORE_EMPLOYEE" => Ok(PlatformRole::StoreEmployee),
        "DEFAULT_USER" => Ok(PlatformRole::DefaultUser),
        _ => bail!("Unknown platform role: {raw}"),
    }
}

fn parse_store_role(raw: &str) -> Result<StoreRole> {
    match raw.to_ascii_uppercase().as_str() {
        "OWNER" => Ok(StoreRole::Owner),
        "MANAGER" => Ok(StoreRole::Manager),
        "EMPLOYEE" => Ok(StoreRole::Employee),
        "VIEWER" => Ok(StoreRole::Viewer),
        _ => bail!("Unknown store role: {raw}"),
    }
}

fn prompt(label: &str) -> Result<String> {
    use std::io::Write;
    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

// ── Output formatting ────────────────────────────────────────────

fn print_user(user: &User) {
    println!("{} <{}>  {:?}", user.name, user.email, user.role);
    for access in &user.stores {
        println!(
            "  {}  {:?}  {}",
            access.store_slug,
            access.store_role,
            if access.is_active { "active" } else { "inactive" }
        );
    }
}

fn print_store_line(store: &Store) {
    let (total, enabled) = store.collection_counts();
    println!(
        "{}  {}  {}  collections {enabled}/{total}",
        store.id,
        store.name,
        if store.is_active { "active" } else { "inactive" }
    );
}

fn print_store(store: &Store) {
    println!("{} ({})", store.name, store.id);
    println!("  slug:   {}", store.slug);
    println!("  email:  {}", store.client_email);
    println!("  active: {}", store.is_active);
    println!("  collections:");
    for (key, enabled) in &store.collections {
        println!("    {key}: {}", if *enabled { "enabled" } else { "disabled" });
    }
}

fn print_product_line(product: &Product) {
    println!(
        "{}  {}  {}  stock {}  {}",
        product.id,
        product.name,
        price::format(product.discounted_price()),
        product.stock.total(),
        if product.is_active { "active" } else { "inactive" }
    );
}

fn print_product(product: &Product) {
    println!("{} ({})", product.name, product.id);
    println!("  collection: {}", product.collection_key);
    println!("  price:      {}", price::format(product.price));
    if product.discount > 0 {
        println!(
            "  discounted: {} ({}% off)",
            price::format(product.discounted_price()),
            product.discount
        );
    }
    println!("  stock:      {}", product.stock.total());
    println!("  active:     {}", product.is_active);
    if !product.image_list.is_empty() {
        println!("  images:     {}", product.image_list.len());
    }
    if product.analytics.view_count > 0 || product.analytics.sales_count > 0 {
        println!(
            "  analytics:  {} views, {} sales",
            product.analytics.view_count, product.analytics.sales_count
        );
    }
}
