use std::net::SocketAddr;

use axum::Router;
use serenity::Client;
use tracing::info;

/// The Discord client and the rank card web server, run side by side.
pub(crate) struct BotService {
    pub(crate) client: Client,
    pub(crate) router: Router,
}

#[shuttle_runtime::async_trait]
impl shuttle_runtime::Service for BotService {
    async fn bind(mut self, addr: SocketAddr) -> Result<(), shuttle_runtime::Error> {
        info!("🔌 Rank cards served on http://{addr}");
        let router = self.router;
        let client = &mut self.client;

        tokio::try_join!(
            async {
                let listener = tokio::net::TcpListener::bind(addr).await?;
                axum::serve(listener, router).await?;
                Ok::<_, anyhow::Error>(())
            },
            async {
                client.start_autosharded().await?;
                Ok::<_, anyhow::Error>(())
            },
        )?;
        Ok(())
    }
}
