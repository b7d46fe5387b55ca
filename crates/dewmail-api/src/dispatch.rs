//! Glue between the SMTP front end and the relay.

use dewmail_relay::RelayDispatcher;
use dewmail_smtp::{Dispatch, ParsedMail};

/// Hands mail accepted over SMTP to the relay dispatcher.
#[derive(Debug, Clone)]
pub struct RelayDispatch(pub RelayDispatcher);

impl Dispatch for RelayDispatch {
    fn dispatch(
        &self,
        mail: ParsedMail,
    ) -> impl std::future::Future<Output = anyhow::Result<()>> + Send {
        async move {
            self.0.dispatch(mail.message, &mail.received).await?;
            Ok(())
        }
    }
}
