use crate::events_out::EventsOutTx;
use crate::progress::ProgressMessage;

pub async fn write_progress_event(out: Option<&EventsOutTx>, message: &ProgressMessage) {
    let Some(out) = out else {
        return;
    };
    if let Ok(line) = serde_json::to_string(message) {
        out.send_line(line).await;
    }
}
