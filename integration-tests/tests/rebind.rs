mod utils;
use utils::{start_plivo, OLD_TUNNEL_URL, PHONE_NUMBER};

#[cfg(test)]
mod rebind_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ship_defs::{BindingClass, DeployError, RebindOutcome, TelephonyProvider};
    use ship_pipeline::{InMemoryTelephony, PlivoClient, WebhookRebinder};
    use std::time::Duration;

    #[tokio::test]
    async fn test_rebind_from_old_tunnel_then_already_correct() {
        let plivo = start_plivo(&[(PHONE_NUMBER, OLD_TUNNEL_URL)]).await;
        let client = PlivoClient::new(&plivo.settings(), Duration::from_secs(5)).unwrap();
        let rebinder = WebhookRebinder::new(&client);

        let first = rebinder
            .rebind(PHONE_NUMBER, "https://demo.up.example")
            .await
            .unwrap();
        match &first {
            RebindOutcome::Updated { previous, current } => {
                assert_eq!(previous.answer_url.as_deref(), Some(OLD_TUNNEL_URL));
                assert_eq!(
                    current.answer_url.as_deref(),
                    Some("https://demo.up.example/answer")
                );
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(plivo.writes(), 1);
        assert_eq!(plivo.reads(), 2);

        let second = rebinder
            .rebind(PHONE_NUMBER, "https://demo.up.example")
            .await
            .unwrap();
        assert!(matches!(second, RebindOutcome::AlreadyCorrect(_)));
        assert_eq!(plivo.writes(), 1);
        assert_eq!(plivo.reads(), 3);
        assert_eq!(
            plivo.answer_url(PHONE_NUMBER).as_deref(),
            Some("https://demo.up.example/answer")
        );
    }

    #[tokio::test]
    async fn test_number_with_leading_plus_addresses_same_resource() {
        let plivo = start_plivo(&[(PHONE_NUMBER, OLD_TUNNEL_URL)]).await;
        let client = PlivoClient::new(&plivo.settings(), Duration::from_secs(5)).unwrap();

        let binding = client.get_binding("+1 415-555-0100").await.unwrap();
        assert_eq!(binding.answer_url.as_deref(), Some(OLD_TUNNEL_URL));
    }

    #[tokio::test]
    async fn test_unknown_number_is_an_http_error() {
        let plivo = start_plivo(&[]).await;
        let client = PlivoClient::new(&plivo.settings(), Duration::from_secs(5)).unwrap();

        let result = WebhookRebinder::new(&client)
            .rebind(PHONE_NUMBER, "https://demo.up.example")
            .await;
        assert!(matches!(result, Err(DeployError::Http { .. })));
        assert_eq!(plivo.writes(), 0);
    }

    #[tokio::test]
    async fn test_write_not_reflected_on_read_back() {
        let telephony = InMemoryTelephony::with_binding(PHONE_NUMBER, OLD_TUNNEL_URL);
        telephony.state().drop_writes = true;

        let result = WebhookRebinder::new(&telephony)
            .rebind(PHONE_NUMBER, "https://demo.up.example")
            .await;

        match result {
            Err(DeployError::RebindVerificationFailed {
                number, expected, ..
            }) => {
                assert_eq!(number, PHONE_NUMBER);
                assert_eq!(expected, "POST https://demo.up.example/answer");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_numbers_are_classified_against_domain() {
        let plivo = start_plivo(&[
            (PHONE_NUMBER, "https://demo.up.example/answer"),
            ("14155550101", "https://ab12.ngrok-free.app/answer"),
            ("14155550102", OLD_TUNNEL_URL),
        ])
        .await;
        let client = PlivoClient::new(&plivo.settings(), Duration::from_secs(5)).unwrap();

        let listed = WebhookRebinder::new(&client)
            .list_bindings(Some("demo.up.example"))
            .await
            .unwrap();
        let classes: Vec<(String, BindingClass)> = listed
            .into_iter()
            .map(|(binding, class)| (binding.number, class))
            .collect();
        assert_eq!(
            classes,
            vec![
                (PHONE_NUMBER.to_string(), BindingClass::Deployed),
                ("14155550101".to_string(), BindingClass::Tunnel),
                ("14155550102".to_string(), BindingClass::Other),
            ]
        );
    }
}
