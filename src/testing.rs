//! 测试辅助：进程内 HTTP 服务

use axum::Router;

/// 在 127.0.0.1 随机端口上启动 router，返回 `http://127.0.0.1:<port>`
pub(crate) async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{}", addr)
}
