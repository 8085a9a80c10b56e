pub mod demographics;
pub mod dimensions;
pub mod fact;
pub mod immigration;
pub mod mapping;
pub mod temperature;

pub use demographics::DemographicsRecord;
pub use dimensions::{
    CountryRow, DateDimensionRow, DemographicsDimensionRow, PortDimensionRow, TravelModeRow,
    VisaRow,
};
pub use fact::VisitFact;
pub use immigration::ImmigrationRecord;
pub use mapping::{LookupRow, LookupTable, MappingDimension, ParseIssue, PortLookupRow};
pub use temperature::CityTemperatureRecord;
