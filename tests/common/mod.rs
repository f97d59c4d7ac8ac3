pub mod mock_vendor;
