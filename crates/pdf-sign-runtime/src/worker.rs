use crate::{PageSetSummary, SignCommand, SignUpdate};
use pdf_signpages::{SessionStep, SigningSession};
use tokio::sync::mpsc;

/// Async worker task that drives a signing session from UI commands.
///
/// Returns the session when the command channel closes or on `Shutdown`.
pub async fn worker_task(
    mut session: SigningSession,
    mut command_rx: mpsc::UnboundedReceiver<SignCommand>,
    update_tx: mpsc::UnboundedSender<SignUpdate>,
) -> SigningSession {
    let mut pending = None;

    loop {
        let cmd = match pending.take() {
            Some(cmd) => cmd,
            None => match command_rx.recv().await {
                Some(cmd) => cmd,
                None => break,
            },
        };

        match cmd {
            SignCommand::AcceptSignature { mut signature } => {
                // Only the newest queued signature is worth rendering
                while let Ok(next_cmd) = command_rx.try_recv() {
                    if let SignCommand::AcceptSignature {
                        signature: newer_signature,
                    } = next_cmd
                    {
                        log::debug!("Discarding queued signature, using newer capture");
                        signature = newer_signature;
                    } else {
                        // Handle it after this signature is rendered
                        pending = Some(next_cmd);
                        break;
                    }
                }

                handle_accept_signature(&mut session, &signature, &update_tx).await;
            }
            SignCommand::MarkPageSigned {
                document_index,
                page_index,
            } => {
                handle_mark_page_signed(&mut session, document_index, page_index, &update_tx);
            }
            SignCommand::CompleteUser => {
                handle_complete_user(&mut session, &update_tx).await;
            }
            SignCommand::Shutdown => break,
        }
    }

    session
}

async fn handle_accept_signature(
    session: &mut SigningSession,
    signature: &[u8],
    update_tx: &mpsc::UnboundedSender<SignUpdate>,
) {
    let _ = update_tx.send(SignUpdate::Started {
        operation: "Rendering signature pages".to_string(),
    });

    match session.accept_signature(signature).await {
        Ok(()) => {
            let _ = update_tx.send(SignUpdate::PageSetsGenerated {
                user_index: session.user_index(),
                pages: session.page_sets().iter().map(PageSetSummary::from).collect(),
            });
        }
        Err(e) => {
            log::warn!("Signature pages failed: {}", e);
            let _ = update_tx.send(SignUpdate::Error {
                message: format!("Failed to render signature pages: {}", e),
            });
        }
    }
}

fn handle_mark_page_signed(
    session: &mut SigningSession,
    document_index: usize,
    page_index: usize,
    update_tx: &mpsc::UnboundedSender<SignUpdate>,
) {
    let update = match session.mark_page_signed(document_index, page_index) {
        Ok(()) => SignUpdate::PageMarked {
            document_index,
            page_index,
            user_complete: session.is_user_complete(),
        },
        Err(e) => SignUpdate::Error {
            message: e.to_string(),
        },
    };
    let _ = update_tx.send(update);
}

async fn handle_complete_user(
    session: &mut SigningSession,
    update_tx: &mpsc::UnboundedSender<SignUpdate>,
) {
    let _ = update_tx.send(SignUpdate::Started {
        operation: "Assembling signed documents".to_string(),
    });

    let update = match session.complete_user().await {
        Ok(SessionStep::NextUser { user_index }) => SignUpdate::UserCompleted {
            next_user_index: user_index,
        },
        Ok(SessionStep::Finished(documents)) => SignUpdate::Finished { documents },
        Err(e) => {
            log::warn!("Completing user failed: {}", e);
            SignUpdate::Error {
                message: format!("Failed to assemble documents: {}", e),
            }
        }
    };
    let _ = update_tx.send(update);
}
