use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::import::ImportReport;

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub link: String,
}

pub async fn import_tournament(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> Result<Json<ImportReport>, ApiError> {
    Ok(Json(state.importer.import(&request.link).await?))
}

#[cfg(test)]
mod tests {
    use crate::api::routes::test_support::*;
    use crate::bracket::StaticBracket;
    use crate::models::{Match, Participant};
    use axum::http::StatusCode;

    fn bracket() -> StaticBracket {
        StaticBracket {
            participants: vec![
                Participant::new(1, "Alice - Dragons"),
                Participant::new(2, "Bob - Plants"),
            ],
            matches: vec![Match::new(1, 2, 1, "2-0")],
        }
    }

    #[tokio::test]
    async fn test_import_tournament() {
        let (app, _) = test_app(bracket(), Some(1)).await;

        let (status, report) = post_json(
            app.clone(),
            "/tournament",
            r#"{"link": "https://challonge.com/locals42"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["tournamentId"], "locals42");
        assert_eq!(report["previousImports"], 0);
        assert_eq!(report["champion"], "Alice - Dragons");
        assert_eq!(report["decks"][0]["created"], true);

        let (_, decks) = get_json(app, "/decks/alice").await;
        assert_eq!(decks[0]["gamesWon"], 2);
        assert_eq!(decks[0]["matchesWon"], 1);
        assert_eq!(decks[0]["tournyWins"], 1);
    }

    #[tokio::test]
    async fn test_reimport_is_flagged() {
        let (app, _) = test_app(bracket(), None).await;
        let body = r#"{"link": "challonge.com/locals42"}"#;

        post_json(app.clone(), "/tournament", body).await;
        let (status, report) = post_json(app.clone(), "/tournament", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["previousImports"], 1);
        assert_eq!(report["decks"][0]["created"], false);

        let (_, decks) = get_json(app, "/decks/alice").await;
        assert_eq!(decks[0]["gamesWon"], 4);
    }

    #[tokio::test]
    async fn test_import_invalid_link() {
        let (app, _) = test_app(bracket(), None).await;
        let (status, json) =
            post_json(app, "/tournament", r#"{"link": "not-a-bracket"}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_import_bad_bracket_data() {
        let broken = StaticBracket {
            participants: vec![Participant::new(1, "Alice - Dragons")],
            matches: vec![Match::new(1, 9, 1, "2-0")],
        };
        let (app, store) = test_app(broken, None).await;
        let (status, json) =
            post_json(app, "/tournament", r#"{"link": "challonge.com/locals42"}"#).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["error"]["code"], "BAD_GATEWAY");
        assert!(store.list_decks(false).await.unwrap().is_empty());
    }
}
