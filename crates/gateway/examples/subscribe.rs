//! Quick subscriber test: connect, pull once, print what came back.

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[tokio::main]
async fn main() {
    let url = std::env::var("RELAY_URL").unwrap_or_else(|_| "ws://localhost:8080/websocket".to_string());
    println!("Connecting to: {}", url);

    let (mut ws, response) = match tokio::time::timeout(
        std::time::Duration::from_secs(10),
        connect_async(&url),
    )
    .await
    {
        Ok(Ok(pair)) => pair,
        Ok(Err(e)) => {
            println!("Connection error: {:?}", e);
            return;
        }
        Err(_) => {
            println!("Connection timed out after 10 seconds!");
            return;
        }
    };
    println!("Connected! Status: {:?}", response.status());

    ws.send(Message::Text("DATA".into())).await.unwrap();
    match tokio::time::timeout(std::time::Duration::from_secs(5), ws.next()).await {
        Ok(Some(Ok(Message::Binary(data)))) => {
            println!("Received {} bytes", data.len());
        }
        Ok(other) => {
            println!("Unexpected response: {:?}", other);
        }
        Err(_) => {
            println!("No payload yet (nothing pushed so far)");
        }
    }

    ws.close(None).await.ok();
}
