use axum::{Extension, extract::Query, response::Html};

use crate::{api::CallbackSlot, types::CallbackParams, warning};

/// Hands the provider's redirect parameters to the login waiting on `slot`.
///
/// Validation happens in the session manager; this handler only forwards. The slot
/// is single-use, so a replayed redirect finds it empty.
pub async fn callback(
    Query(params): Query<CallbackParams>,
    Extension(slot): Extension<CallbackSlot>,
) -> Html<&'static str> {
    let Some(tx) = slot.lock().await.take() else {
        return Html("<h4>No login in progress.</h4>");
    };

    let denied = params.error.is_some();
    if tx.send(params).is_err() {
        warning!("Callback received after the login gave up waiting");
        return Html("<h4>Login expired. Please try again.</h4>");
    }

    if denied {
        Html("<h4>Authorization was denied.</h4>")
    } else {
        Html("<h2>Authorization received.</h2><p>You can close this window.</p>")
    }
}
