#![forbid(unsafe_code)]
//! Run the fundledger service: restore the ledger, start the API server.

use fundledger::node::Node;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let node = Arc::new(Node::init().await?);
    node.start().await
}
