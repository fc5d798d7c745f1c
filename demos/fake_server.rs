//! # Example: fake_server
//!
//! A pretend websocket server exposing three async events.
//!
//! Shows how to:
//! - Subscribe closures to a [`Notifier`] and to [`EventHandler`]s
//! - Tie a subscription to an owner's lifetime with a [`WeakNotifier`]
//! - Cancel the shared token from inside a subscriber and observe that
//!   later invocations are refused
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► register subscribers (started ×2, audit (weak), connected, message)
//!   └─► server.run(token)
//!         ├─► started.invoke(token)          → both subscribers run concurrently
//!         ├─► audit.invoke(token)            → owner dropped, nothing runs
//!         ├─► sleep 1s
//!         ├─► client_connected.invoke(id=1)  → subscriber cancels the token
//!         ├─► sleep 1s
//!         └─► message_received.invoke(..)    → Err(PreCancelled)
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=asyncfan=debug cargo run --example fake_server
//! ```

use std::{sync::Arc, time::Duration};

use asyncfan::{
    Config, EventContext, EventHandler, InvokeError, Notifier, Sender, SubscriberError,
    WeakNotifier,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

struct ClientConnected {
    client_id: u32,
}

struct MessageReceived {
    message: String,
}

struct FakeWebsocketServer {
    name: &'static str,
    started: Notifier,
    audit: WeakNotifier,
    client_connected: EventHandler<EventContext<ClientConnected>>,
    message_received: EventHandler<EventContext<MessageReceived>>,
}

impl FakeWebsocketServer {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            started: Notifier::with_config(Config::named("started")),
            audit: WeakNotifier::with_config(Config::named("audit")),
            client_connected: EventHandler::with_config(Config::named("client-connected")),
            message_received: EventHandler::with_config(Config::named("message-received")),
        }
    }

    fn sender(&self) -> Option<Sender> {
        Some(Arc::new(self.name))
    }

    async fn run(&self, token: CancellationToken) {
        if let Err(err) = self.started.invoke(&token).await {
            println!("[server] started event failed: {err}");
        }
        if let Err(err) = self.audit.invoke(&token).await {
            println!("[server] audit event failed: {err}");
        }

        tokio::time::sleep(Duration::from_secs(1)).await;
        let connected = EventContext::new(ClientConnected { client_id: 1 });
        if let Err(err) = self
            .client_connected
            .invoke(self.sender(), connected, &token)
            .await
        {
            println!("[server] client-connected event failed: {err}");
        }

        tokio::time::sleep(Duration::from_secs(1)).await;
        let message = EventContext::new(MessageReceived {
            message: "Hello!".into(),
        });
        match self
            .message_received
            .invoke(self.sender(), message, &token)
            .await
        {
            Ok(()) => println!("[server] message delivered"),
            Err(err) if err.is_cancelled() => println!("[server] token was cancelled: {err}"),
            Err(err) => println!("[server] message-received event failed: {err}"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== fake_server example ===\n");

    let server = FakeWebsocketServer::new("ws://localhost:9000");
    let token = CancellationToken::new();

    // 1. Two subscribers on the zero-argument event; they run concurrently.
    server.started.register_fn("started-fast", |_token: CancellationToken| async move {
        println!("[started-fast] done");
        Ok::<_, SubscriberError>(())
    });
    server.started.register_fn("started-slow", |token: CancellationToken| async move {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(1)) => {
                println!("[started-slow] done");
                Ok(())
            }
            _ = token.cancelled() => Err(SubscriberError::Canceled),
        }
    });

    // 2. A weak subscription whose owner goes away before the event fires.
    let auditor = Arc::new("auditor");
    server
        .audit
        .register_fn(&auditor, "audit", |_token: CancellationToken| async move {
            println!("[audit] this never prints");
            Ok::<_, SubscriberError>(())
        });
    drop(auditor);

    // 3. The connect subscriber cancels the shared token.
    let trip = token.clone();
    server.client_connected.register_fn(
        "on-connect",
        move |sender: Option<Sender>, e: Arc<EventContext<ClientConnected>>| {
            let trip = trip.clone();
            async move {
                let from = sender
                    .as_deref()
                    .and_then(|s| s.downcast_ref::<&'static str>())
                    .copied()
                    .unwrap_or("unknown");
                println!("[on-connect] client {} connected to {from}", e.client_id);
                trip.cancel();
                Ok::<_, SubscriberError>(())
            }
        },
    );

    // 4. Never reached: the token is already cancelled when messages arrive.
    server.message_received.register_fn(
        "on-message",
        |_sender: Option<Sender>, e: Arc<EventContext<MessageReceived>>| async move {
            println!("[on-message] new message: {}", e.message);
            Ok::<_, SubscriberError>(())
        },
    );

    server.run(token).await;

    // 5. Failures are aggregated, never dropped.
    let flaky = Notifier::with_config(Config::named("flaky"));
    flaky.register_fn("first", |_t: CancellationToken| async move {
        Err::<(), _>(SubscriberError::fail("disk full"))
    });
    flaky.register_fn("second", |_t: CancellationToken| async move {
        Err::<(), _>(SubscriberError::fail("timeout"))
    });
    if let Err(InvokeError::Aggregate(agg)) = flaky.invoke_default().await {
        println!("\n[flaky] {} failures:", agg.len());
        for failure in agg.failures() {
            println!("  - {failure}");
        }
    }

    println!("\n=== done ===");
    Ok(())
}
