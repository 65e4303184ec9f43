mod utils;
#[allow(unused)]
use utils::*;

#[cfg(feature = "integration")]
mod tests {
    use super::*;

    use std::time::Duration;
    use surge::prelude::*;
    use surge::ClientError;
    use surge_runtime::SurgeRuntime;

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(30_000)]
    async fn uniform_run_passes() {
        init().await;

        let urls = default_urls(MOCK_TARGET);
        let endpoints = TrafficMix::Uniform.endpoints(&urls).unwrap();
        let config = RunConfig::new(20, Duration::from_secs(3)).unwrap();

        let stats = LoadTest::new(endpoints, config).unwrap().await;

        assert!(stats.iterations >= 40, "{stats}");
        assert_eq!(stats.failures, 0, "{stats}");
        assert_eq!(stats.error_rate(), 0.);
        for url in &urls {
            assert!(stats.endpoint(url).unwrap().iterations > 0, "{url}");
        }
        assert!(stats.latency_p99 >= stats.latency_p50);
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(30_000)]
    async fn weighted_run_favors_simple() {
        init().await;

        let urls = default_urls(MOCK_TARGET);
        let endpoints = TrafficMix::weighted().endpoints(&urls).unwrap();
        let config = RunConfig::new(50, Duration::from_secs(4))
            .unwrap()
            .pause(Duration::from_millis(100));

        let stats = LoadTest::new(endpoints, config).unwrap().await;

        assert_eq!(stats.failures, 0, "{stats}");
        let simple = stats.endpoint(&urls[0]).unwrap().iterations;
        let compute = stats.endpoint(&urls[2]).unwrap().iterations;
        assert!(simple > compute, "{stats}");
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(30_000)]
    async fn missing_route_fails_checks() {
        init().await;

        let ok = format!("{MOCK_TARGET}/");
        let missing = format!("{MOCK_TARGET}/missing");
        let endpoints = Endpoints::new(&[
            EndpointSpec::new(&ok, 50.),
            EndpointSpec::new(&missing, 50.),
        ])
        .unwrap();
        let config = RunConfig::new(10, Duration::from_secs(2)).unwrap();

        let stats = LoadTest::new(endpoints, config).unwrap().await;

        let failed = stats.endpoint(&missing).unwrap();
        assert!(failed.iterations > 0);
        assert_eq!(failed.failures, failed.iterations);
        assert_eq!(stats.endpoint(&ok).unwrap().failures, 0);
        assert_eq!(stats.failures, failed.iterations);
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(30_000)]
    async fn unreachable_target_fails_every_check() {
        init().await;

        let urls = default_urls("http://127.0.0.1:9");
        let endpoints = TrafficMix::Uniform.endpoints(&urls).unwrap();
        let config = RunConfig::new(5, Duration::from_secs(2))
            .unwrap()
            .request_timeout(Duration::from_secs(1));

        let stats = LoadTest::new(endpoints, config).unwrap().await;

        assert!(stats.iterations > 0);
        assert_eq!(stats.successes, 0);
        assert_eq!(stats.failures, stats.iterations);
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ntest::timeout(30_000)]
    async fn runtime_runs_against_target() {
        init().await;

        let stats = SurgeRuntime::new()
            .target(MOCK_TARGET)
            .vus(5)
            .duration(Duration::from_secs(2))
            .run()
            .await
            .unwrap();

        assert_eq!(stats.virtual_users, 5);
        assert_eq!(stats.failures, 0);
        assert!(stats.iterations >= 10);
    }

    #[tokio::test]
    #[ntest::timeout(10_000)]
    async fn refused_connection_is_unavailable() {
        init().await;

        // Port 9 (discard) is expected to refuse connections on the test host.
        let client = ReqwestClient::with_timeout(Duration::from_secs(2)).unwrap();
        let err = client.get("http://127.0.0.1:9/").await.unwrap_err();
        assert!(matches!(err, ClientError::Unavailable(_)), "{err:?}");

        let ok = client.get(&format!("{MOCK_TARGET}/")).await.unwrap();
        assert_eq!(ok.status, 200);
    }
}
