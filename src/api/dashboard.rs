use log::{info, warn};
use rocket::{http::CookieJar, serde::json::Json, Route, State};

use crate::{
    config::Config,
    error::{Error, Result},
    model::{
        dashboard::{DashboardScreen, DashboardSession},
        election::ElectionPatch,
        grid::{DialogKind, PendingAction},
        sidebar::{collapsed_cookie, Sidebar, Viewport},
    },
    remote::ElectionApi,
    session::{SessionCookie, SessionStore},
};

type Sessions = SessionStore<DashboardSession>;
type AdminKey = SessionCookie<DashboardSession>;

const SCOPE: &str = "dashboard";

pub fn routes() -> Vec<Route> {
    routes![
        elections,
        toggle_sidebar,
        mobile_sheet,
        publish,
        open_dialog,
        confirm_dialog,
        cancel_dialog,
    ]
}

fn with_session<R>(
    sessions: &Sessions,
    key: &AdminKey,
    f: impl FnOnce(&mut DashboardSession) -> R,
) -> Result<R> {
    sessions.with(&key.id, f).ok_or_else(Error::session_expired)
}

fn screen(sessions: &Sessions, key: &AdminKey, viewport: Viewport) -> Result<Json<DashboardScreen>> {
    with_session(sessions, key, |session| session.screen(viewport)).map(Json)
}

/// Reload the election list after a successful mutation. A failed reload
/// leaves the stale list in place.
async fn refresh(api: &dyn ElectionApi, sessions: &Sessions, key: &AdminKey) -> Result<()> {
    match api.list_elections().await {
        Ok(elections) => with_session(sessions, key, |session| session.grid.refresh(elections)),
        Err(e) => {
            warn!("Failed to refresh elections: {e}");
            Ok(())
        }
    }
}

#[get("/dashboard/elections")]
async fn elections(
    previous: Option<AdminKey>,
    viewport: Viewport,
    cookies: &CookieJar<'_>,
    api: &State<Box<dyn ElectionApi>>,
    sessions: &State<Sessions>,
    config: &State<Config>,
) -> Result<Json<DashboardScreen>> {
    if let Some(previous) = previous {
        sessions.remove(&previous.id);
    }

    let elections = api.list_elections().await?;
    let mut session = DashboardSession::new(Sidebar::from_cookies(cookies), elections);
    let screen = session.screen(viewport);

    let id = sessions.insert(session);
    info!("Started dashboard session {id}");
    cookies.add_private(AdminKey::new(id, SCOPE).into_cookie(config));

    Ok(Json(screen))
}

#[post("/dashboard/sidebar/toggle")]
async fn toggle_sidebar(
    viewport: Viewport,
    key: AdminKey,
    cookies: &CookieJar<'_>,
    sessions: &State<Sessions>,
) -> Result<Json<DashboardScreen>> {
    key.ensure_scope(SCOPE)?;
    if let Some(collapsed) = with_session(sessions, &key, |session| session.sidebar.toggle(viewport))? {
        cookies.add(collapsed_cookie(collapsed));
    }
    screen(sessions, &key, viewport)
}

#[post("/dashboard/sidebar/mobile?<open>")]
async fn mobile_sheet(
    open: bool,
    viewport: Viewport,
    key: AdminKey,
    sessions: &State<Sessions>,
) -> Result<Json<DashboardScreen>> {
    key.ensure_scope(SCOPE)?;
    with_session(sessions, &key, |session| session.sidebar.set_open_mobile(open))?;
    screen(sessions, &key, viewport)
}

#[post("/dashboard/elections/<id>/publish", rank = 1)]
async fn publish(
    id: &str,
    viewport: Viewport,
    key: AdminKey,
    api: &State<Box<dyn ElectionApi>>,
    sessions: &State<Sessions>,
) -> Result<Json<DashboardScreen>> {
    key.ensure_scope(SCOPE)?;

    let target = with_session(sessions, &key, |session| session.grid.publish_target(id))??;
    let outcome = api.publish(&target).await;
    let published = outcome.is_ok();
    with_session(sessions, &key, |session| session.grid.finish_publish(&target, outcome))?;

    if published {
        refresh(api.inner().as_ref(), sessions, &key).await?;
    }
    screen(sessions, &key, viewport)
}

#[post("/dashboard/elections/<id>/<kind>", rank = 2)]
async fn open_dialog(
    id: &str,
    kind: DialogKind,
    viewport: Viewport,
    key: AdminKey,
    sessions: &State<Sessions>,
) -> Result<Json<DashboardScreen>> {
    key.ensure_scope(SCOPE)?;
    with_session(sessions, &key, |session| session.grid.open_dialog(kind, id))??;
    screen(sessions, &key, viewport)
}

#[post("/dashboard/dialog/confirm", data = "<patch>")]
async fn confirm_dialog(
    patch: Option<Json<ElectionPatch>>,
    viewport: Viewport,
    key: AdminKey,
    api: &State<Box<dyn ElectionApi>>,
    sessions: &State<Sessions>,
) -> Result<Json<DashboardScreen>> {
    key.ensure_scope(SCOPE)?;

    let patch = patch.map(Json::into_inner);
    let action = with_session(sessions, &key, |session| session.grid.begin_confirm(patch))??;
    let guard = sessions.reset_on_drop(&key.id, |session| session.grid.abandon_confirm());
    let outcome = match &action {
        PendingAction::Edit { election_id, patch } => api.edit(election_id, patch).await,
        PendingAction::Delete { election_id } => api.delete(election_id).await,
        PendingAction::ConvertToDraft { election_id } => api.convert_to_draft(election_id).await,
    };
    guard.disarm();
    let succeeded = outcome.is_ok();
    with_session(sessions, &key, |session| session.grid.finish_confirm(outcome))?;

    if succeeded {
        refresh(api.inner().as_ref(), sessions, &key).await?;
    }
    screen(sessions, &key, viewport)
}

#[post("/dashboard/dialog/cancel")]
async fn cancel_dialog(
    viewport: Viewport,
    key: AdminKey,
    sessions: &State<Sessions>,
) -> Result<Json<DashboardScreen>> {
    key.ensure_scope(SCOPE)?;
    with_session(sessions, &key, |session| session.grid.cancel_dialog())??;
    screen(sessions, &key, viewport)
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Header, Status},
        local::asynchronous::{Client, LocalResponse},
        serde::json::{json, Value},
    };

    use crate::model::sidebar::SIDEBAR_COOKIE;
    use crate::remote::stub::StubApi;

    fn desktop() -> Header<'static> {
        Header::new("Viewport-Width", "1280")
    }

    fn phone() -> Header<'static> {
        Header::new("Viewport-Width", "390")
    }

    async fn body(response: LocalResponse<'_>) -> Value {
        assert_eq!(Status::Ok, response.status());
        response.into_json::<Value>().await.unwrap()
    }

    async fn post<'c>(client: &'c Client, path: &str) -> LocalResponse<'c> {
        client.post(format!("/dashboard/{path}")).dispatch().await
    }

    #[backend_test]
    async fn grid_lists_elections(client: Client) {
        let screen = body(client.get("/dashboard/elections").dispatch().await).await;

        let cards = screen["grid"]["cards"].as_array().unwrap();
        assert_eq!(cards.len(), 3);
        assert_eq!(cards[0]["status"], "published");
        assert_eq!(cards[0]["actions"], json!(["edit", "delete", "convert-to-draft"]));
        assert_eq!(cards[1]["actions"], json!(["edit", "delete", "publish"]));
        assert_eq!(screen["grid"]["dialog"], Value::Null);

        let active: Vec<_> = screen["sidebar"]["navigation"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|item| item["active"] == true)
            .map(|item| item["name"].clone())
            .collect();
        assert_eq!(active, vec![json!("Elections")]);
    }

    #[backend_test]
    async fn actions_need_a_session(client: Client) {
        let response = post(&client, "elections/e2/publish").await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[backend_test(admin)]
    async fn publish_refreshes_list(client: Client, api: StubApi) {
        let screen = body(post(&client, "elections/e2/publish").await).await;

        assert_eq!(screen["grid"]["notice"]["level"], "success");
        assert_eq!(screen["grid"]["notice"]["message"], "Election published successfully!");
        assert_eq!(screen["grid"]["cards"][1]["status"], "published");
        assert_eq!(api.calls().last().map(String::as_str), Some("list"));
    }

    #[backend_test(admin)]
    async fn publish_failure_shows_server_message(client: Client, api: StubApi) {
        api.fail_next(Some("Election has no ballots"));
        let screen = body(post(&client, "elections/e2/publish").await).await;

        assert_eq!(screen["grid"]["notice"]["level"], "error");
        assert_eq!(screen["grid"]["notice"]["message"], "Election has no ballots");
        assert_eq!(screen["grid"]["cards"][1]["status"], "draft");
    }

    #[backend_test(admin)]
    async fn publish_unknown_election(client: Client, api: StubApi) {
        let response = post(&client, "elections/nope/publish").await;
        assert_eq!(Status::NotFound, response.status());
        assert!(!api.calls().iter().any(|call| call.starts_with("publish")));
    }

    #[backend_test(admin)]
    async fn unavailable_actions_never_reach_api(client: Client, api: StubApi) {
        let response = post(&client, "elections/e1/publish").await;
        assert_eq!(Status::UnprocessableEntity, response.status());

        let response = post(&client, "elections/e2/convert-to-draft").await;
        assert_eq!(Status::UnprocessableEntity, response.status());

        // No dialog was opened, so there is nothing to confirm.
        let response = post(&client, "dialog/confirm").await;
        assert_eq!(Status::Conflict, response.status());
        assert_eq!(api.calls(), vec!["list".to_string()]);
    }

    #[backend_test(admin)]
    async fn delete_through_dialog(client: Client, api: StubApi) {
        let screen = body(post(&client, "elections/e2/delete").await).await;
        assert_eq!(screen["grid"]["dialog"]["kind"], "delete");
        assert_eq!(screen["grid"]["dialog"]["electionTitle"], "Sports Captain");
        assert_eq!(screen["grid"]["dialog"]["busy"], false);

        let response = post(&client, "elections/e1/delete").await;
        assert_eq!(Status::Conflict, response.status());

        let screen = body(post(&client, "dialog/confirm").await).await;
        assert_eq!(screen["grid"]["dialog"], Value::Null);
        assert_eq!(screen["grid"]["notice"]["message"], "Election deleted successfully!");
        assert_eq!(screen["grid"]["cards"].as_array().unwrap().len(), 2);
        assert!(api.election("e2").is_none());
    }

    #[backend_test(admin)]
    async fn failed_action_keeps_dialog_open(client: Client, api: StubApi) {
        body(post(&client, "elections/e1/convert-to-draft").await).await;

        api.fail_next(None);
        let screen = body(post(&client, "dialog/confirm").await).await;
        assert_eq!(screen["grid"]["dialog"]["kind"], "convert-to-draft");
        assert_eq!(screen["grid"]["dialog"]["busy"], false);
        assert_eq!(screen["grid"]["notice"]["message"], "Failed to convert to draft");

        let screen = body(post(&client, "dialog/confirm").await).await;
        assert_eq!(screen["grid"]["dialog"], Value::Null);
        assert_eq!(screen["grid"]["cards"][0]["status"], "draft");
    }

    #[backend_test(admin)]
    async fn edit_needs_patch(client: Client, api: StubApi) {
        body(post(&client, "elections/e1/edit").await).await;

        let response = post(&client, "dialog/confirm").await;
        assert_eq!(Status::UnprocessableEntity, response.status());

        let response = client
            .post("/dashboard/dialog/confirm")
            .header(ContentType::JSON)
            .body(json!({ "title": "Student Union 2026" }).to_string())
            .dispatch()
            .await;
        let screen = body(response).await;
        assert_eq!(screen["grid"]["notice"]["message"], "Election updated successfully!");
        assert_eq!(screen["grid"]["cards"][0]["title"], "Student Union 2026");
        assert_eq!(api.election("e1").unwrap().title, "Student Union 2026");
    }

    #[backend_test(admin)]
    async fn dialog_needs_listed_election(client: Client) {
        let response = post(&client, "elections/nope/delete").await;
        assert_eq!(Status::NotFound, response.status());

        let response = post(&client, "elections/e1/archive").await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(admin)]
    async fn cancel_dialog(client: Client, api: StubApi) {
        let response = post(&client, "dialog/cancel").await;
        assert_eq!(Status::Conflict, response.status());

        body(post(&client, "elections/e2/delete").await).await;
        let screen = body(post(&client, "dialog/cancel").await).await;
        assert_eq!(screen["grid"]["dialog"], Value::Null);
        assert!(!api.calls().iter().any(|call| call.starts_with("delete")));
    }

    #[backend_test(admin)]
    async fn desktop_toggle_persists(client: Client) {
        let response = client
            .post("/dashboard/sidebar/toggle")
            .header(desktop())
            .dispatch()
            .await;
        let screen = body(response).await;
        assert_eq!(screen["sidebar"]["collapsed"], true);
        assert_eq!(screen["sidebar"]["showLogo"], false);
        assert_eq!(screen["sidebar"]["navigation"][0]["tooltip"], "Dashboard");

        let cookie = client.cookies().get(SIDEBAR_COOKIE).map(|c| c.value().to_string());
        assert_eq!(cookie.as_deref(), Some("true"));

        // A fresh dashboard session picks the preference back up.
        let screen = body(client.get("/dashboard/elections").header(desktop()).dispatch().await).await;
        assert_eq!(screen["sidebar"]["collapsed"], true);
    }

    #[backend_test(admin)]
    async fn mobile_toggle_opens_sheet(client: Client) {
        let response = client
            .post("/dashboard/sidebar/toggle")
            .header(phone())
            .dispatch()
            .await;
        let screen = body(response).await;
        assert_eq!(screen["sidebar"]["isMobile"], true);
        assert_eq!(screen["sidebar"]["openMobile"], true);
        assert_eq!(screen["sidebar"]["collapsed"], false);
        assert!(client.cookies().get(SIDEBAR_COOKIE).is_none());

        let response = client
            .post("/dashboard/sidebar/mobile?open=false")
            .header(phone())
            .dispatch()
            .await;
        let screen = body(response).await;
        assert_eq!(screen["sidebar"]["openMobile"], false);
    }
}
