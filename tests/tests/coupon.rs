//! Benchmarks against a coupon service listening on `BASE_URI`.
//!
//! Run with `--features integration` once the service is up.
#[cfg(feature = "integration")]
mod tests {
    use coupon_bench::{scenario, Endpoint, Target, BASE_URI};
    use reqwest::Client;
    use slobench_tests::init;

    async fn bench(endpoint: Endpoint) {
        init();
        let target = Target::new(Client::new(), BASE_URI);
        let report = scenario(endpoint, target)
            .await
            .unwrap_or_else(|err| panic!("{err}"));
        println!("{report}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn coupon_issued_count() {
        bench(Endpoint::IssuedCount).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn coupon_used_count() {
        bench(Endpoint::UsedCount).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn issuable_coupons() {
        bench(Endpoint::Issuable).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn member_coupons() {
        bench(Endpoint::MemberCoupons).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn max_discount_member() {
        bench(Endpoint::MaxDiscountMember).await;
    }
}
