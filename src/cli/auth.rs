use std::time::Duration;

use tabled::Table;
use tokio::time::timeout;

use crate::{
    api, error, info,
    management::SessionState,
    server::start_api_server,
    success,
    types::{ProfileTableRow, UserProfile},
    warning,
};

use super::{session_manager, spinner};

const CALLBACK_WAIT: Duration = Duration::from_secs(120);

/// Runs the authorization code flow end to end.
///
/// Starts the local callback server, opens the authorization URL in the browser
/// (or prints it when no browser can be launched), waits up to two minutes for the
/// provider's redirect and completes the login with it.
pub async fn login() {
    let manager = match session_manager() {
        Ok(m) => m,
        Err(e) => error!("Cannot start login: {}", e),
    };

    if let Err(e) = manager.restore().await {
        error!("Cannot restore session: {}", e);
    }
    if let SessionState::Authenticated(user) = manager.state() {
        info!(
            "Already signed in as {}. Run moodgroov logout first.",
            user.display_name
        );
        return;
    }

    let (slot, rx) = api::callback_slot();
    let addr = manager.flow().config().server_addr.clone();
    let server = tokio::spawn(async move {
        if let Err(e) = start_api_server(&addr, slot).await {
            warning!("Callback server stopped: {}", e);
        }
    });

    let request = manager.begin_login().await;
    if webbrowser::open(request.url.as_str()).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            request.url
        )
    }

    info!("Waiting for authorization...");
    let params = timeout(CALLBACK_WAIT, rx).await;
    server.abort();

    let params = match params {
        Ok(Ok(params)) => params,
        Ok(Err(_)) => error!("Callback server stopped before authorization completed."),
        Err(_) => error!("Authorization timed out."),
    };

    let pb = spinner("Signing in...");
    let result = manager.complete_login(&params).await;
    pb.finish_and_clear();

    match result {
        Ok(user) => success!("Authentication successful! Welcome, {}.", user.display_name),
        Err(e) => error!("Login failed ({}): {}", e.kind(), e),
    }
}

/// Restores the stored session and prints the profile it belongs to.
pub async fn status() {
    let manager = match session_manager() {
        Ok(m) => m,
        Err(e) => error!("Cannot load session: {}", e),
    };

    let pb = spinner("Restoring session...");
    let restored = manager.restore().await;
    pb.finish_and_clear();

    if let Err(e) = restored {
        error!("Cannot restore session: {}", e);
    }

    match manager.state() {
        SessionState::Authenticated(user) => {
            success!("Signed in.");
            println!("{}", Table::new(profile_rows(&user)));
        }
        _ => info!("Not signed in. Run moodgroov login."),
    }
}

/// Prints a valid access token, refreshing an expired one first.
pub async fn token() {
    let manager = match session_manager() {
        Ok(m) => m,
        Err(e) => error!("Cannot load session: {}", e),
    };

    if let Err(e) = manager.restore().await {
        error!("Cannot restore session: {}", e);
    }

    match manager.access_token().await {
        Ok(token) => println!("{token}"),
        Err(e) => error!("No usable token ({}): {}. Run moodgroov login.", e.kind(), e),
    }
}

pub async fn logout() {
    let manager = match session_manager() {
        Ok(m) => m,
        Err(e) => error!("Cannot load session: {}", e),
    };

    manager.logout().await;
    success!("Signed out.");
}

fn profile_rows(user: &UserProfile) -> Vec<ProfileTableRow> {
    let mut rows = vec![
        row("id", &user.id),
        row("name", &user.display_name),
        row("email", &user.email),
        row("country", &user.country),
    ];
    if let Some(followers) = user.follower_count {
        rows.push(row("followers", &followers.to_string()));
    }
    if let Some(product) = &user.product_tier {
        rows.push(row("product", product));
    }
    if let Some(image) = user.image_urls.first() {
        rows.push(row("image", image));
    }
    rows
}

fn row(field: &str, value: &str) -> ProfileTableRow {
    ProfileTableRow {
        field: field.to_string(),
        value: value.to_string(),
    }
}
