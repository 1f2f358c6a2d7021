//! Cat photo commands backed by the keyed store.
//!
//! Photos live under `cat:<name>` as a JSON array of URLs, so lookup by
//! index and random selection both stay one read.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use rand::Rng;
use serde_json::json;
use url::Url;

use crate::conditions::Condition;
use crate::context::CommandContext;
use crate::dispatch::AppContext;
use crate::error::DeliveryError;
use crate::payload::OutboundMessage;
use crate::store::KeyValueStore;
use crate::trigger::{ResponseCommand, Trigger, TriggerRegistry};

pub fn register(registry: &mut TriggerRegistry) {
    registry.register(CatCommand::new());
    registry.register(AddCat::new());
    registry.register(ListCats::new());
    registry.register(RemoveCat::new());
}

fn cat_key(name: &str) -> String {
    format!("cat:{name}")
}

fn stored_cats(store: &dyn KeyValueStore, name: &str) -> Result<Vec<String>> {
    match store.get(&cat_key(name))? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(Vec::new()),
    }
}

fn save_cats(store: &dyn KeyValueStore, name: &str, urls: &[String]) -> Result<()> {
    if urls.is_empty() {
        store.delete(&cat_key(name))?;
        Ok(())
    } else {
        store.set(&cat_key(name), &serde_json::to_string(urls)?)
    }
}

/// The cat API redirects to the selected image; the redirect target is the
/// answer, so redirects must not be followed.
async fn random_cat_gif(api_key: &str) -> Result<String> {
    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    let resp = client
        .head("https://api.thecatapi.com/v1/images/search?format=src&mime_types=image/gif")
        .header("x-api-key", api_key)
        .send()
        .await?;
    let location = resp
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .context("cat API returned no redirect location")?;
    Ok(location.to_string())
}

enum CatLookup {
    Image { url: String, alt: String },
    Text(String),
}

pub struct CatCommand {
    condition: Condition,
}

impl CatCommand {
    pub fn new() -> Self {
        Self {
            condition: Condition::is_command(["cat", "getcat"]),
        }
    }

    async fn resolve(&self, ctx: &CommandContext, app: &AppContext) -> Result<CatLookup> {
        let args = ctx.args();
        if !matches!(args.len(), 1 | 2) {
            let url = random_cat_gif(&app.config.cat_api_key).await?;
            return Ok(CatLookup::Image {
                url,
                alt: "cat gif".into(),
            });
        }

        let name = args[0].to_lowercase();
        let urls = stored_cats(app.store.as_ref(), &name)?;
        if urls.is_empty() {
            return Ok(CatLookup::Text(format!(
                "No cats named {} registered",
                args[0]
            )));
        }
        let offset = if args.len() == 2 {
            let number = &args[1];
            let Ok(n) = number.parse::<usize>() else {
                return Ok(CatLookup::Text(format!(
                    "Second argument must be a number. Got `{number}`"
                )));
            };
            if (1..=urls.len()).contains(&n) {
                n - 1
            } else {
                rand::rng().random_range(0..urls.len())
            }
        } else {
            rand::rng().random_range(0..urls.len())
        };
        Ok(CatLookup::Image {
            url: urls[offset].clone(),
            alt: args[0].clone(),
        })
    }
}

// Implemented directly rather than through the response-command tier: a
// rejected image delivery posts a follow-up notice before the failure is
// escalated.
#[async_trait]
impl Trigger for CatCommand {
    fn name(&self) -> &str {
        "cat"
    }

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn help(&self) -> Option<&str> {
        Some("`cat [name] [number]`: gives one cat")
    }

    async fn run(&self, ctx: &CommandContext, app: &AppContext) -> Result<()> {
        let channel = ctx.event().channel().map(str::to_string);
        let thread_ts = ctx.event().thread_ts();
        match self.resolve(ctx, app).await? {
            CatLookup::Text(text) => {
                let mut message = OutboundMessage::text(text).in_thread(thread_ts);
                message.channel = channel;
                let response = app.api.post_message(&message).await?;
                if !response.ok() {
                    return Err(DeliveryError::Failed {
                        body: response.body().clone(),
                    }
                    .into());
                }
            }
            CatLookup::Image { url, alt } => {
                let mut message = OutboundMessage::blocks(json!([{
                    "type": "image",
                    "image_url": url,
                    "alt_text": alt,
                }]))
                .in_thread(thread_ts);
                message.channel = channel.clone();
                let response = app.api.post_message(&message).await?;
                if !response.ok() {
                    // Tell the channel before escalating the failure.
                    let mut followup = OutboundMessage::text(format!(
                        "Image could not be retrieved by Slack: {url}"
                    ));
                    followup.channel = channel;
                    app.api.post_message(&followup).await?;
                    return Err(DeliveryError::Failed {
                        body: response.body().clone(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}

pub struct AddCat {
    condition: Condition,
}

impl AddCat {
    pub fn new() -> Self {
        Self {
            condition: Condition::is_command(["addcat", "addacat", "registercat"]),
        }
    }
}

#[async_trait]
impl ResponseCommand for AddCat {
    fn name(&self) -> &str {
        "addcat"
    }

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn help(&self) -> Option<&str> {
        Some("`addcat [name] [photo_url]`: add a cat to the database")
    }

    async fn message_args(
        &self,
        ctx: &CommandContext,
        app: &AppContext,
    ) -> Result<Vec<OutboundMessage>> {
        let thread_ts = ctx.event().ts();
        let args = ctx.args();
        if args.len() != 2 {
            return Ok(vec![OutboundMessage::text(format!(
                "Expected 2 args (name, url). Got {}",
                args.len()
            ))
            .in_thread(thread_ts)]);
        }
        let name = args[0].to_lowercase();
        // The client wraps URLs as <url> or <url|label>.
        let url = args[1]
            .trim_start_matches('<')
            .trim_end_matches('>')
            .split('|')
            .next()
            .unwrap_or_default();
        if Url::parse(url).is_err() {
            return Ok(vec![OutboundMessage::text(format!(
                "`{url}` is not a valid URL"
            ))
            .in_thread(thread_ts)]);
        }
        let mut urls = stored_cats(app.store.as_ref(), &name)?;
        urls.push(url.to_string());
        save_cats(app.store.as_ref(), &name, &urls)?;
        Ok(vec![OutboundMessage::default()
            .with_attachments(json!([{
                "text": format!("Registered {}!", args[0]),
                "image_url": url,
            }]))
            .in_thread(thread_ts)])
    }
}

pub struct ListCats {
    condition: Condition,
}

impl ListCats {
    pub fn new() -> Self {
        Self {
            condition: Condition::is_command(["listcats"]),
        }
    }
}

#[async_trait]
impl ResponseCommand for ListCats {
    fn name(&self) -> &str {
        "listcats"
    }

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn help(&self) -> Option<&str> {
        Some("`listcats`: see all cats available for the `cat` command")
    }

    async fn message_args(
        &self,
        _ctx: &CommandContext,
        app: &AppContext,
    ) -> Result<Vec<OutboundMessage>> {
        let mut names: Vec<String> = app
            .store
            .list_keys("cat:")?
            .into_iter()
            .filter_map(|key| key.strip_prefix("cat:").map(str::to_string))
            .collect();
        names.sort();
        Ok(vec![OutboundMessage::text(format!(
            "Cats in database: {}",
            names.join(", ")
        ))])
    }
}

pub struct RemoveCat {
    condition: Condition,
}

impl RemoveCat {
    pub fn new() -> Self {
        Self {
            condition: Condition::is_command(["removecat"]),
        }
    }
}

#[async_trait]
impl ResponseCommand for RemoveCat {
    fn name(&self) -> &str {
        "removecat"
    }

    fn condition(&self) -> &Condition {
        &self.condition
    }

    fn help(&self) -> Option<&str> {
        Some("`removecat [name] [number]`: delete a photo from the database")
    }

    async fn message_args(
        &self,
        ctx: &CommandContext,
        app: &AppContext,
    ) -> Result<Vec<OutboundMessage>> {
        let args = ctx.args();
        if args.len() != 2 {
            return Ok(vec![OutboundMessage::text(format!(
                "Expected 2 args (name, number). Got {}",
                args.len()
            ))]);
        }
        let name = args[0].to_lowercase();
        let number = &args[1];
        // Arguments are validated in full before the store is touched.
        let Ok(offset) = number.parse::<i64>() else {
            return Ok(vec![OutboundMessage::text(format!(
                "Second argument must be a number. Got `{number}`"
            ))]);
        };
        if offset <= 0 {
            return Ok(vec![OutboundMessage::text(format!(
                "Number must be > 0. Got `{offset}`"
            ))]);
        }
        let mut urls = stored_cats(app.store.as_ref(), &name)?;
        let index = (offset - 1) as usize;
        if index >= urls.len() {
            return Ok(vec![OutboundMessage::text("No matching rows")]);
        }
        urls.remove(index);
        save_cats(app.store.as_ref(), &name, &urls)?;
        Ok(vec![OutboundMessage::text("Successfully removed!")])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiMethod;
    use crate::plugins::testing::{message_context, test_app};

    #[tokio::test]
    async fn test_addcat_then_fetch_by_index() {
        let (api, store, app) = test_app();
        let ctx = message_context("addcat fluffy <https://example.com/fluffy.gif>");
        AddCat::new().run(&ctx, &app).await.unwrap();
        assert_eq!(
            store.get("cat:fluffy").unwrap().unwrap(),
            r#"["https://example.com/fluffy.gif"]"#
        );

        let ctx = message_context("cat fluffy 1");
        CatCommand::new().run(&ctx, &app).await.unwrap();
        let calls = api.calls_for(ApiMethod::PostMessage);
        let image = &calls.last().unwrap()["blocks"][0];
        assert_eq!(image["image_url"], "https://example.com/fluffy.gif");
        assert_eq!(image["alt_text"], "fluffy");
    }

    #[tokio::test]
    async fn test_cat_unknown_name() {
        let (api, _store, app) = test_app();
        let ctx = message_context("cat mittens");
        CatCommand::new().run(&ctx, &app).await.unwrap();
        let calls = api.calls_for(ApiMethod::PostMessage);
        assert_eq!(calls[0]["text"], "No cats named mittens registered");
    }

    #[tokio::test]
    async fn test_cat_rejected_image_notifies_then_errors() {
        let (api, store, app) = test_app();
        store
            .set("cat:fluffy", r#"["https://example.com/fluffy.gif"]"#)
            .unwrap();
        api.fail_method(ApiMethod::PostMessage);

        let ctx = message_context("cat fluffy 1");
        let err = CatCommand::new().run(&ctx, &app).await.unwrap_err();
        assert!(err.downcast_ref::<DeliveryError>().is_some());

        let calls = api.calls_for(ApiMethod::PostMessage);
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1]["text"],
            "Image could not be retrieved by Slack: https://example.com/fluffy.gif"
        );
    }

    #[tokio::test]
    async fn test_removecat_rejects_non_numeric_without_touching_store() {
        let (api, store, app) = test_app();
        store
            .set("cat:fluffy", r#"["https://example.com/fluffy.gif"]"#)
            .unwrap();

        let ctx = message_context("removecat fluffy one");
        RemoveCat::new().run(&ctx, &app).await.unwrap();

        let calls = api.calls_for(ApiMethod::PostMessage);
        assert_eq!(calls[0]["text"], "Second argument must be a number. Got `one`");
        assert_eq!(
            store.get("cat:fluffy").unwrap().unwrap(),
            r#"["https://example.com/fluffy.gif"]"#
        );
    }

    #[tokio::test]
    async fn test_removecat_removes_and_clears_empty_entries() {
        let (api, store, app) = test_app();
        store
            .set("cat:fluffy", r#"["https://example.com/fluffy.gif"]"#)
            .unwrap();

        let ctx = message_context("removecat fluffy 1");
        RemoveCat::new().run(&ctx, &app).await.unwrap();

        let calls = api.calls_for(ApiMethod::PostMessage);
        assert_eq!(calls[0]["text"], "Successfully removed!");
        assert!(store.get("cat:fluffy").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_addcat_rejects_invalid_url() {
        let (api, store, app) = test_app();
        let ctx = message_context("addcat fluffy <not-a-url>");
        AddCat::new().run(&ctx, &app).await.unwrap();

        let calls = api.calls_for(ApiMethod::PostMessage);
        assert_eq!(calls[0]["text"], "`not-a-url` is not a valid URL");
        assert!(store.get("cat:fluffy").unwrap().is_none());
    }
}
