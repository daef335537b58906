//! Career sites scanned when the search document does not list its own.

use crate::config::{SearchConfig, SourceDefinition};

pub const BUILT_IN_SOURCES: &[(&str, &str)] = &[
    ("Intel", "https://intel.wd1.myworkdayjobs.com/External"),
    ("AT&T", "https://att.wd1.myworkdayjobs.com/ATTGeneral"),
    ("Adobe", "https://adobe.wd5.myworkdayjobs.com/external_experienced"),
    ("HP", "https://hp.wd5.myworkdayjobs.com/ExternalCareerSite"),
    ("Salesforce", "https://salesforce.wd12.myworkdayjobs.com/External_Career_Site"),
    ("Ancestry", "https://ancestry.wd5.myworkdayjobs.com/Careers"),
    ("Slack", "https://salesforce.wd12.myworkdayjobs.com/Slack"),
    ("Activision", "https://activision.wd1.myworkdayjobs.com/External"),
    ("Autodesk", "https://autodesk.wd1.myworkdayjobs.com/Ext"),
    ("Avant", "https://avant.wd1.myworkdayjobs.com/External_Careers"),
    ("BlackBerry", "https://bb.wd3.myworkdayjobs.com/BlackBerry"),
    ("Boston Dynamics", "https://bostondynamics.wd1.myworkdayjobs.com/Boston_Dynamics"),
    ("Cadence", "https://cadence.wd1.myworkdayjobs.com/External_Careers"),
    ("Dell", "https://dell.wd1.myworkdayjobs.com/External"),
    ("DraftKings", "https://draftkings.wd1.myworkdayjobs.com/en-US/DraftKings/jobs"),
    ("Etsy", "https://etsy.wd5.myworkdayjobs.com/Etsy_Careers"),
    ("Workday", "https://workday.wd5.myworkdayjobs.com/Workday"),
    ("Razer", "https://razer.wd3.myworkdayjobs.com/Careers"),
    ("Red Hat", "https://redhat.wd5.myworkdayjobs.com/Jobs"),
    ("Siemens", "https://onehealthineers.wd3.myworkdayjobs.com/SHSJB"),
    ("Snapchat", "https://wd1.myworkdaysite.com/en-US/recruiting/snapchat/snap"),
    ("Chevron", "https://chevron.wd5.myworkdayjobs.com/jobs"),
    ("Mastercard", "https://mastercard.wd1.myworkdayjobs.com/CorporateCareers"),
    ("NVIDIA", "https://nvidia.wd5.myworkdayjobs.com/NVIDIAExternalCareerSite"),
    ("Microchip", "https://wd5.myworkdaysite.com/recruiting/microchiphr/External"),
    ("NXP", "https://nxp.wd3.myworkdayjobs.com/careers"),
    ("Analog Devices", "https://analogdevices.wd1.myworkdayjobs.com/External"),
    ("Bank of America", "https://ghr.wd1.myworkdayjobs.com/Lateral-US"),
    ("Citi", "https://citi.wd5.myworkdayjobs.com/CitiGlobal"),
    ("Morgan Stanley", "https://ms.wd5.myworkdayjobs.com/External"),
    ("BMO", "https://bmo.wd3.myworkdayjobs.com/External"),
    ("Blackstone", "https://blackstone.wd1.myworkdayjobs.com/Blackstone_Careers"),
    ("Toyota", "https://toyota.wd5.myworkdayjobs.com/TMNA"),
    ("Southwest", "https://swa.wd1.myworkdayjobs.com/external"),
    ("Abbott", "https://abbott.wd5.myworkdayjobs.com/abbottcareers"),
    ("3M", "https://3m.wd1.myworkdayjobs.com/Search"),
    ("Comcast", "https://comcast.wd5.myworkdayjobs.com/Comcast_Careers"),
    ("The Washington Post", "https://washpost.wd5.myworkdayjobs.com/washingtonpostcareers"),
    ("Warner Bros", "https://warnerbros.wd5.myworkdayjobs.com/en-US/global"),
    ("Netflix", "https://netflix.wd1.myworkdayjobs.com/Netflix"),
    ("Accenture", "https://accenture.wd103.myworkdayjobs.com/en-US/AccentureCareers/"),
];

pub fn built_in() -> Vec<SourceDefinition> {
    BUILT_IN_SOURCES
        .iter()
        .map(|(name, endpoint)| SourceDefinition::new(*name, *endpoint))
        .collect()
}

/// The configured sources, or the built-in registry when none are configured.
pub fn resolve(config: &SearchConfig) -> Vec<SourceDefinition> {
    match &config.sources {
        Some(sources) => sources.clone(),
        None => built_in(),
    }
}
