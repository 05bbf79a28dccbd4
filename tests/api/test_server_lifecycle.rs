// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Server binds, answers over a real socket, and shuts down cleanly

use crate::common::{context_with, MockModel};
use fabstir_rag_node::{api::ApiServer, documents::Document};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[tokio::test]
async fn test_server_answers_over_tcp_and_shuts_down() {
    let model = MockModel::replying("Ontology is the study of being.");
    let ctx = context_with(
        vec![Document::new("Ontology is the study of being", "a.pdf")],
        model.clone(),
    )
    .await;

    let server = ApiServer::start("127.0.0.1:0", ctx).await.unwrap();
    let addr = server.local_addr();
    assert_ne!(addr.port(), 0);

    let body = "question=What+is+ontology%3F";
    let request = format!(
        "POST /chatbot HTTP/1.1\r\nHost: {}\r\nContent-Type: application/x-www-form-urlencoded\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        addr,
        body.len(),
        body
    );

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();

    assert!(raw.starts_with("HTTP/1.1 200"));
    assert!(raw.contains(r#"{"response":"Ontology is the study of being."}"#));
    assert_eq!(model.call_count(), 1);

    server.shutdown().await.unwrap();
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_bind_failure_is_error() {
    let ctx = context_with(vec![], MockModel::replying("unused")).await;
    assert!(ApiServer::start("not-an-address", ctx).await.is_err());
}
