//! Command line client for the Campus Connect event platform. Supports
//! account signup/login, catalog browsing, event registration with paid
//! checkout, and admin management of events, categories, and posters.

mod api;
mod checkout;
mod config;
mod gate;
mod loopback;
mod model;
mod session;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use api::{Api, ApiError};
use checkout::{Outcome, RegistrationFlow};
use config::Settings;
use gate::{Access, Gate};
use loopback::LoopbackCheckout;
use model::{AuthRequest, Category, CategoryRequest, Event, EventRequest, SignupRequest, User};
use session::SessionStore;

/// Command line interface entry point.
#[derive(Parser)]
#[command(
    name = "campusctl",
    author,
    version,
    about = "Campus Connect event platform client"
)]
struct Cli {
    /// Path to the `.env` configuration file.
    #[arg(long, default_value = ".env")]
    env: String,
    /// Print request and checkout diagnostics.
    #[arg(long, global = true)]
    verbose: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Create an account and log in.
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        mobile: String,
        #[arg(long)]
        department: String,
        #[arg(long)]
        reg_number: String,
        #[arg(long)]
        year: u32,
        #[arg(long)]
        gender: String,
    },
    /// Log in with email and password.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Log out and clear the stored session.
    Logout,
    /// Show the logged-in account.
    Whoami,
    /// List catalog events and categories.
    Events {
        /// Restrict to one category id.
        #[arg(long)]
        category: Option<u64>,
        /// Only events that have not happened yet.
        #[arg(long)]
        upcoming: bool,
    },
    /// Show one event in detail.
    Event { id: u64 },
    /// Register for an event, paying through checkout if it has a fee.
    Register { id: u64 },
    /// Cancel a registration.
    Unregister { id: u64 },
    /// List events you are registered for.
    MyEvents,
    /// Show your profile.
    Profile,
    /// Administrative commands.
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

/// Operations available under `campusctl admin`.
#[derive(Subcommand)]
enum AdminAction {
    /// Create an event.
    CreateEvent {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        club: String,
        /// ISO-8601 date-time, e.g. `2025-04-10T09:00:00`.
        #[arg(long)]
        date_time: String,
        #[arg(long)]
        venue: String,
        #[arg(long, default_value = "")]
        poster_url: String,
        #[arg(long)]
        max_attendees: u32,
        #[arg(long, default_value_t = 0.0)]
        price: f64,
        #[arg(long)]
        category_id: u64,
    },
    /// Update an event, replacing all of its fields.
    UpdateEvent {
        id: u64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        club: String,
        #[arg(long)]
        date_time: String,
        #[arg(long)]
        venue: String,
        #[arg(long, default_value = "")]
        poster_url: String,
        #[arg(long)]
        max_attendees: u32,
        #[arg(long, default_value_t = 0.0)]
        price: f64,
        #[arg(long)]
        category_id: u64,
    },
    /// Delete an event.
    DeleteEvent { id: u64 },
    /// List attendees registered for an event.
    Attendees { id: u64 },
    /// Create a category.
    CreateCategory {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
    },
    /// Update a category.
    UpdateCategory {
        id: u64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
    },
    /// Delete a category.
    DeleteCategory { id: u64 },
    /// Upload a poster image and print its URL.
    Upload { file: String },
}

/// Execute the selected CLI subcommand.
async fn run(cli: Cli) -> Result<()> {
    ensure_env_file(&cli.env)?;
    let cfg = Settings::from_env(&cli.env)?;
    let mut store = SessionStore::open(cfg.state_root.clone());
    let api = Api::new(
        &cfg.api_base,
        store.current().map(|s| s.token.clone()),
        Duration::from_secs(cfg.http_timeout_secs),
        cli.verbose,
    )?;

    match cli.command {
        Commands::Signup {
            name,
            email,
            password,
            mobile,
            department,
            reg_number,
            year,
            gender,
        } => {
            // Local validation happens before any network call.
            if password.len() < 6 {
                bail!("Password must be at least 6 characters long");
            }
            let request = SignupRequest {
                name,
                email: email.clone(),
                password: password.clone(),
                mobile_number: mobile,
                department,
                registration_number: reg_number,
                year,
                gender,
            };
            relay(api.signup(&request).await, &mut store)?;
            // Auto login after successful registration.
            let auth = relay(api.login(&AuthRequest { email, password }).await, &mut store)?;
            let name = auth.user.name.clone();
            store.login(auth)?;
            println!("Welcome to Campus Connect, {name}. You are logged in.");
        }
        Commands::Login { email, password } => {
            let auth = relay(api.login(&AuthRequest { email, password }).await, &mut store)?;
            let who = auth.user.name.clone();
            store.login(auth)?;
            let role = match store.role() {
                Some(session::Role::Admin) => "admin",
                _ => "user",
            };
            println!("Logged in as {who} ({role}).");
        }
        Commands::Logout => {
            store.logout()?;
            println!("Logged out.");
        }
        Commands::Whoami => match store.current() {
            Some(session) => {
                let role = match session.role() {
                    session::Role::Admin => "admin",
                    session::Role::User => "user",
                };
                println!("{} <{}> ({role})", session.user.name, session.user.email);
            }
            None => println!("Not logged in."),
        },
        Commands::Events { category, upcoming } => {
            let events = if let Some(category_id) = category {
                relay(api.events_by_category(category_id).await, &mut store)?
            } else if upcoming {
                relay(api.upcoming_events().await, &mut store)?
            } else {
                // Events and categories load concurrently, like the
                // catalog page does.
                let (events, categories) = relay(api.catalog().await, &mut store)?;
                if !categories.is_empty() {
                    println!("Categories:");
                    for category in &categories {
                        print_category(category);
                    }
                    println!();
                }
                events
            };
            if events.is_empty() {
                println!("No events found.");
            } else {
                println!("Events:");
                for event in &events {
                    print_event_row(event);
                }
            }
        }
        Commands::Event { id } => {
            let event = relay(api.event(id).await, &mut store)?;
            print_event_detail(&event, store.is_authenticated());
        }
        Commands::Register { id } => {
            let event = relay(api.event(id).await, &mut store)?;
            let driver = LoopbackCheckout::new(
                Duration::from_secs(cfg.checkout_timeout_secs),
                cli.verbose,
            );
            let mut flow = RegistrationFlow::new();
            let result = flow
                .run(&api, store.current(), &driver, &cfg, &event)
                .await;
            let outcome = match result {
                Err(err) if is_unauthorized(&err) => return forced_logout(&mut store),
                other => other?,
            };
            match outcome {
                Outcome::LoginRequired => {
                    bail!("login required; run `campusctl login` first")
                }
                Outcome::EventFull => bail!("Event Full: no spots remaining"),
                Outcome::FreeConfirmed => {
                    println!("Registration successful! You are registered for this event.");
                    refresh_availability(&api, id).await;
                }
                Outcome::PaidConfirmed => {
                    println!(
                        "Registration confirmed! Your payment was successful and you are now registered."
                    );
                    refresh_availability(&api, id).await;
                }
                Outcome::RegistrationFailed(message) => {
                    bail!("registration failed: {message}")
                }
                Outcome::PaymentFailed(message) => bail!(
                    "payment verification failed: {message}; contact support if the amount was deducted"
                ),
                Outcome::Dismissed => bail!(
                    "checkout was not completed; no payment captured, run register again to retry"
                ),
            }
        }
        Commands::Unregister { id } => {
            require(Gate::User, &store)?;
            let message = relay(api.unregister(id).await, &mut store)?;
            println!("{}", message);
        }
        Commands::MyEvents => {
            require(Gate::User, &store)?;
            let events = relay(api.my_events().await, &mut store)?;
            if events.is_empty() {
                println!("You are not registered for any events.");
            } else {
                println!("Your events:");
                for event in &events {
                    print_event_row(event);
                }
            }
        }
        Commands::Profile => {
            require(Gate::User, &store)?;
            let user = relay(api.profile().await, &mut store)?;
            print_profile(&user);
        }
        Commands::Admin { action } => {
            require(Gate::Admin, &store)?;
            run_admin(action, &api, &mut store).await?;
        }
    }
    Ok(())
}

/// Execute an admin subcommand; the admin gate has already been checked.
async fn run_admin(action: AdminAction, api: &Api, store: &mut SessionStore) -> Result<()> {
    match action {
        AdminAction::CreateEvent {
            name,
            description,
            club,
            date_time,
            venue,
            poster_url,
            max_attendees,
            price,
            category_id,
        } => {
            let request = EventRequest {
                name,
                description,
                organizing_club: club,
                date_time,
                venue,
                poster_url,
                max_attendees,
                registration_price: price,
                category_id,
            };
            let event = relay(api.create_event(&request).await, store)?;
            println!("Created event [{}] {}", event.id, event.name);
        }
        AdminAction::UpdateEvent {
            id,
            name,
            description,
            club,
            date_time,
            venue,
            poster_url,
            max_attendees,
            price,
            category_id,
        } => {
            let request = EventRequest {
                name,
                description,
                organizing_club: club,
                date_time,
                venue,
                poster_url,
                max_attendees,
                registration_price: price,
                category_id,
            };
            let event = relay(api.update_event(id, &request).await, store)?;
            println!("Updated event [{}] {}", event.id, event.name);
        }
        AdminAction::DeleteEvent { id } => {
            relay(api.delete_event(id).await, store)?;
            println!("Deleted event [{id}]");
        }
        AdminAction::Attendees { id } => {
            let attendees = relay(api.attendees(id).await, store)?;
            if attendees.is_empty() {
                println!("No attendees registered.");
            } else {
                for user in &attendees {
                    println!(
                        "{} <{}> {} | {} {}",
                        user.name,
                        user.email,
                        user.mobile_number,
                        user.department,
                        user.registration_number
                    );
                }
            }
        }
        AdminAction::CreateCategory { name, description } => {
            let category = relay(
                api.create_category(&CategoryRequest { name, description })
                    .await,
                store,
            )?;
            println!("Created category [{}] {}", category.id, category.name);
        }
        AdminAction::UpdateCategory {
            id,
            name,
            description,
        } => {
            let category = relay(
                api.update_category(id, &CategoryRequest { name, description })
                    .await,
                store,
            )?;
            println!("Updated category [{}] {}", category.id, category.name);
        }
        AdminAction::DeleteCategory { id } => {
            relay(api.delete_category(id).await, store)?;
            println!("Deleted category [{id}]");
        }
        AdminAction::Upload { file } => {
            let path = Path::new(&file);
            // Type and size are checked before any bytes go out.
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase())
                .unwrap_or_default();
            if !matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "gif" | "webp") {
                bail!("invalid file type; select an image (png, jpg, jpeg, gif, webp)");
            }
            let bytes = fs::read(path)?;
            if bytes.len() > 5 * 1024 * 1024 {
                bail!("file too large; posters must be under 5MB");
            }
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("poster")
                .to_string();
            let resp = relay(api.upload(&file_name, bytes).await, store)?;
            println!("{}", resp.url);
        }
    }
    Ok(())
}

/// Enforce a gate, translating redirect outcomes into CLI guidance.
fn require(gate: Gate, store: &SessionStore) -> Result<()> {
    match gate.check(store.current()) {
        Access::Granted => Ok(()),
        Access::RedirectToLogin => {
            bail!("login required; run `campusctl login --email <email> --password <password>`")
        }
        Access::RedirectToDashboard => {
            bail!("admin access required; see your own events with `campusctl my-events`")
        }
    }
}

/// Unwrap an API result, turning a 401 into a forced logout.
fn relay<T>(result: std::result::Result<T, ApiError>, store: &mut SessionStore) -> Result<T> {
    match result {
        Err(ApiError::Unauthorized) => {
            store.logout()?;
            bail!("session expired; local session cleared, log in again with `campusctl login`");
        }
        other => Ok(other?),
    }
}

fn forced_logout(store: &mut SessionStore) -> Result<()> {
    store.logout()?;
    bail!("session expired; local session cleared, log in again with `campusctl login`");
}

fn is_unauthorized(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<ApiError>(), Some(ApiError::Unauthorized))
}

/// Re-fetch an event after registration so the availability shown
/// reflects the new attendee count. Best effort.
async fn refresh_availability(api: &Api, id: u64) {
    if let Ok(event) = api.event(id).await {
        println!(
            "{} / {} spots remaining",
            event.spots_remaining(),
            event.max_attendees
        );
    }
}

fn print_category(category: &Category) {
    println!("  [{}] {}: {}", category.id, category.name, category.description);
}

fn print_event_row(event: &Event) {
    println!(
        "  [{}] {} | {} @ {} | {} | {} ({} / {} spots left)",
        event.id,
        event.name,
        event.date_time,
        event.venue,
        event.category_name,
        fee_label(event),
        event.spots_remaining(),
        event.max_attendees
    );
}

fn print_event_detail(event: &Event, authenticated: bool) {
    println!("{}", event.name);
    println!("Organized by {}", event.organizing_club);
    println!("Category: {}", event.category_name);
    println!("When: {}", event.date_time);
    println!("Venue: {}", event.venue);
    if !event.poster_url.is_empty() {
        println!("Poster: {}", event.poster_url);
    }
    println!("Fee: {}", fee_label(event));
    println!(
        "Availability: {} / {} spots remaining",
        event.spots_remaining(),
        event.max_attendees
    );
    println!();
    println!("{}", event.description);
    println!();
    println!("> {}", register_label(event, authenticated));
}

fn print_profile(user: &User) {
    println!("{} <{}>", user.name, user.email);
    println!("Mobile: {}", user.mobile_number);
    println!("Department: {} (year {})", user.department, user.year);
    println!("Registration number: {}", user.registration_number);
    println!("Roles: {}", user.roles.join(", "));
}

/// Label for the registration trigger shown on the event detail view.
fn register_label(event: &Event, authenticated: bool) -> String {
    if event.spots_remaining() == 0 {
        "Event Full".into()
    } else if !authenticated {
        "Login to Register".into()
    } else if event.is_paid() {
        format!("Pay ₹{} & Register", fmt_price(event.registration_price))
    } else {
        "Register for Event".into()
    }
}

fn fee_label(event: &Event) -> String {
    if event.is_paid() {
        format!("₹{}", fmt_price(event.registration_price))
    } else {
        "Free".into()
    }
}

fn fmt_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("{}", price as u64)
    } else {
        format!("{price:.2}")
    }
}

/// Create a default `.env` file if one is not already present at `path`.
fn ensure_env_file(path: &str) -> Result<()> {
    let env_path = Path::new(path);
    if env_path.exists() {
        return Ok(());
    }
    if let Some(parent) = env_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let base_dir = match env_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    let state_root = base_dir.join("campusctl-data");
    let mut content = String::new();
    content.push_str("API_BASE=http://127.0.0.1:8080\n");
    content.push_str(&format!("STATE_ROOT={}\n", display_path(&state_root)));
    content.push_str("CHECKOUT_KEY_ID=\n");
    content.push_str("CURRENCY=INR\n");
    content.push_str("CHECKOUT_TIMEOUT_SECS=180\n");
    content.push_str("HTTP_TIMEOUT_SECS=30\n");
    fs::write(env_path, content)?;
    Ok(())
}

fn display_path(path: &PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
