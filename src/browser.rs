use std::path::PathBuf;

use anyhow::Context as _;
use async_trait::async_trait;
use base64::Engine as _;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventResponseReceived, GetResponseBodyParams, ResourceType,
    SetUserAgentOverrideParams,
};
use futures::{FutureExt as _, StreamExt as _};
use tokio::task::JoinHandle;
use url::Url;

#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// One page/tab inside a browser session. A worker drives exactly one.
#[async_trait]
pub trait NavigablePage: Send + Sync {
    async fn set_user_agent(&self, user_agent: &str) -> anyhow::Result<()>;

    /// Navigates to `url` and waits until the page has settled.
    async fn navigate(&self, url: &Url) -> anyhow::Result<()>;

    /// Serialized markup of the currently loaded document.
    async fn content(&self) -> anyhow::Result<String>;

    /// Like [`NavigablePage::navigate`], but also records the body of every
    /// stylesheet response observed during the navigation, in arrival order.
    /// The response listener is released before this returns, on failure as
    /// well as on success.
    async fn navigate_capturing_stylesheets(&self, url: &Url) -> anyhow::Result<Vec<String>>;
}

/// An exclusive browser process plus its event loop, owned by one worker.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    type Page: NavigablePage + 'static;

    async fn new_page(&self) -> anyhow::Result<Self::Page>;
    async fn close(&mut self) -> anyhow::Result<()>;
}

pub struct ChromeSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

/// Launches a headless Chromium with a window fixed to `viewport`.
/// `executable` overrides system browser discovery when set.
pub async fn launch(
    viewport: Viewport,
    executable: Option<PathBuf>,
) -> anyhow::Result<ChromeSession> {
    let mut builder = BrowserConfig::builder().window_size(viewport.width, viewport.height);
    if let Some(path) = executable {
        builder = builder.chrome_executable(path);
    }
    let config = builder
        .build()
        .map_err(|err| anyhow::anyhow!("build browser config: {err}"))?;

    let (browser, mut handler) = Browser::launch(config).await.context("launch browser")?;

    let handler_task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(err) = event {
                tracing::debug!(?err, "browser handler error");
            }
        }
    });

    Ok(ChromeSession {
        browser,
        handler_task,
    })
}

#[async_trait]
impl BrowserSession for ChromeSession {
    type Page = ChromePage;

    async fn new_page(&self) -> anyhow::Result<ChromePage> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("open page")?;
        page.execute(EnableParams::default())
            .await
            .context("enable network events")?;
        Ok(ChromePage { page })
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        self.browser.close().await.context("close browser")?;
        self.browser
            .wait()
            .await
            .context("wait for browser exit")?;
        let _ = (&mut self.handler_task).await;
        Ok(())
    }
}

pub struct ChromePage {
    page: Page,
}

#[async_trait]
impl NavigablePage for ChromePage {
    async fn set_user_agent(&self, user_agent: &str) -> anyhow::Result<()> {
        self.page
            .execute(SetUserAgentOverrideParams {
                user_agent: user_agent.to_owned(),
                accept_language: None,
                platform: None,
                user_agent_metadata: None,
            })
            .await
            .context("set user agent")?;
        Ok(())
    }

    async fn navigate(&self, url: &Url) -> anyhow::Result<()> {
        self.page
            .goto(url.as_str())
            .await
            .with_context(|| format!("navigate to {url}"))?;
        self.page
            .wait_for_navigation()
            .await
            .with_context(|| format!("wait for {url} to settle"))?;
        Ok(())
    }

    async fn content(&self) -> anyhow::Result<String> {
        self.page.content().await.context("read page content")
    }

    async fn navigate_capturing_stylesheets(&self, url: &Url) -> anyhow::Result<Vec<String>> {
        let mut responses = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .context("listen for network responses")?;

        let outcome = self.navigate(url).await;

        // Drain whatever arrived while the navigation ran, then drop the
        // stream before surfacing any navigation error.
        let mut stylesheet_requests = Vec::new();
        while let Some(Some(event)) = responses.next().now_or_never() {
            if event.r#type == ResourceType::Stylesheet {
                stylesheet_requests.push(event.request_id.clone());
            }
        }
        drop(responses);
        outcome?;

        let mut bodies = Vec::with_capacity(stylesheet_requests.len());
        for request_id in stylesheet_requests {
            let response = self
                .page
                .execute(GetResponseBodyParams::new(request_id))
                .await
                .context("fetch stylesheet body")?;
            if response.base64_encoded {
                let decoded = base64::engine::general_purpose::STANDARD
                    .decode(&response.body)
                    .context("decode stylesheet body base64")?;
                bodies.push(String::from_utf8_lossy(&decoded).into_owned());
            } else {
                bodies.push(response.body.clone());
            }
        }
        Ok(bodies)
    }
}
