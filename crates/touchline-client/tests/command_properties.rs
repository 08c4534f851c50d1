//! Property tests for terminal input parsing and endpoint derivation.

use proptest::prelude::*;
use touchline_client::{
    command::UserCommand,
    transport::{TransportError, socket_url},
};
use touchline_core::BoardFilter;

fn filter_strategy() -> impl Strategy<Value = BoardFilter> {
    prop::sample::select(BoardFilter::ALL.to_vec())
}

proptest! {
    /// Lines that are not commands are chat text, kept byte for byte.
    #[test]
    fn prop_plain_text_is_said_verbatim(line in "[a-zA-Z0-9!?.,'][^\n/]{0,40}") {
        prop_assert_eq!(line.parse::<UserCommand>(), Ok(UserCommand::Say(line.clone())));
    }

    /// View numbers parse with or without the `#` marker.
    #[test]
    fn prop_view_numbers_parse(view in any::<u64>(), hash in any::<bool>()) {
        let marker = if hash { "#" } else { "" };
        prop_assert_eq!(format!("/close {marker}{view}").parse::<UserCommand>(), Ok(UserCommand::Close(view)));
        prop_assert_eq!(format!("/focus {marker}{view}").parse::<UserCommand>(), Ok(UserCommand::Focus(view)));
    }

    /// Room and match ids pass through untouched.
    #[test]
    fn prop_ids_pass_through(id in "[a-zA-Z0-9_-]{1,24}") {
        prop_assert_eq!(format!("/match {id}").parse::<UserCommand>(), Ok(UserCommand::Match(id.clone())));
        prop_assert_eq!(format!("/chat  {id} ").parse::<UserCommand>(), Ok(UserCommand::Chat(id.clone())));
    }

    /// Filter names are case-insensitive.
    #[test]
    fn prop_filter_names_any_case(view in 0u64..100, filter in filter_strategy(), upper in any::<bool>()) {
        let name = if upper { filter.as_str().to_uppercase() } else { filter.as_str().to_string() };
        prop_assert_eq!(
            format!("/filter {view} {name}").parse::<UserCommand>(),
            Ok(UserCommand::Filter { view, filter })
        );
    }

    /// HTTP endpoints map onto the Engine.IO WebSocket path.
    #[test]
    fn prop_http_servers_map_to_socket_path(
        secure in any::<bool>(),
        host in "[a-z0-9]{1,12}(\\.[a-z]{2,6})?",
        port in prop::option::of(1u16..=u16::MAX),
        trailing in any::<bool>(),
    ) {
        let scheme = if secure { "https" } else { "http" };
        let port = port.map(|p| format!(":{p}")).unwrap_or_default();
        let slash = if trailing { "/" } else { "" };

        let url = socket_url(&format!("{scheme}://{host}{port}{slash}")).unwrap();

        let ws = if secure { "wss" } else { "ws" };
        prop_assert_eq!(url, format!("{ws}://{host}{port}/socket.io/?EIO=4&transport=websocket"));
    }

    /// Anything without a scheme is rejected, never mangled.
    #[test]
    fn prop_schemeless_input_rejected(input in "[^:]{0,40}") {
        let rejected = matches!(socket_url(&input), Err(TransportError::InvalidUrl(_)));
        prop_assert!(rejected);
    }
}
