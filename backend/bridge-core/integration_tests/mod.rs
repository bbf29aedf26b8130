mod connector_tests;
