pub mod csv_file;
pub mod yahoo;

pub use csv_file::CsvMarketDataService;
pub use yahoo::YahooMarketDataService;
