mod account_aggregation_service_tests;
mod identity_resolver_tests;
mod mock_steam_api;
