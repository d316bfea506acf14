use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Orbit, Rocket};
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Reports the port the HTTP server bound to, which is only known after
/// liftoff when the configured port is 0.
pub fn create_pair() -> (PortReporter, ListeningPort) {
    let (sender, receiver) = oneshot::channel();
    (
        PortReporter {
            sender: Mutex::new(Some(sender)),
        },
        ListeningPort { receiver },
    )
}

pub struct ListeningPort {
    receiver: oneshot::Receiver<u16>,
}

impl ListeningPort {
    /// `None` when the server was dropped before it lifted off.
    pub async fn get(self) -> Option<u16> {
        self.receiver.await.ok()
    }
}

pub struct PortReporter {
    sender: Mutex<Option<oneshot::Sender<u16>>>,
}

#[rocket::async_trait]
impl Fairing for PortReporter {
    fn info(&self) -> Info {
        Info {
            name: "Port Reporter",
            kind: Kind::Liftoff,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let port = rocket.config().port;
        tracing::info!(address = %rocket.config().address, port, "Health server listening");
        let sender = match self.sender.lock() {
            Ok(mut sender) => sender.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(sender) = sender {
            // Nobody may be waiting for the port.
            let _ = sender.send(port);
        }
    }
}
