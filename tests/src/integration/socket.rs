//! # Socket-Level Flow
//!
//! A full `StatsNode` on a bound listener, exercised over real HTTP.

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use stats_gateway::{StatsConfig, StoreBackend};
    use stats_node::StatsNode;
    use std::time::Duration;
    use tokio::net::TcpListener;

    async fn wait_for_store(client: &reqwest::Client, base: &str) {
        for _ in 0..100 {
            if let Ok(response) = client.get(format!("{}/health", base)).send().await {
                let health: Value = response.json().await.unwrap();
                if health["store"] == true {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("store never attached");
    }

    #[tokio::test]
    async fn test_node_serves_statistics_over_http() {
        let mut config = StatsConfig::default();
        config.store.backend = StoreBackend::Memory;

        let node = StatsNode::new(config).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(node.run_on(listener, async {
            let _ = rx.await;
        }));

        let client = reqwest::Client::new();
        wait_for_store(&client, &base).await;

        let response = client
            .post(format!("{}/statistics/add", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-remaining"], "34");

        let response = client
            .get(format!("{}/statistics/count", base))
            .send()
            .await
            .unwrap();
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["count"], 1);

        let response = client
            .delete(format!("{}/statistics/delete", base))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let metrics: Value = client
            .get(format!("{}/metrics", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(metrics["operations"]["record"], 1);
        assert_eq!(metrics["records"]["erased"], 1);

        tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
