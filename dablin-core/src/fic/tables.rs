//! Static lookup tables used by the FIC decoder: UEP size/protection/bitrate,
//! EEP size factors, ISO 639 language names, RDS/RBDS programme-type names
//! and announcement-support type names. Pure constants.

pub const UEP_SIZES: [u16; 64] = [
    16, 21, 24, 29, 35, 24, 29, 35, 42, 52, 29, 35, 42, 52, 32, 42, 48, 58, 70, 40, 52, 58, 70, 84,
    48, 58, 70, 84, 104, 58, 70, 84, 104, 64, 84, 96, 116, 140, 80, 104, 116, 140, 168, 96, 116,
    140, 168, 208, 116, 140, 168, 208, 232, 128, 168, 192, 232, 280, 160, 208, 280, 192, 280, 416,
];

pub const UEP_PLS: [u8; 64] = [
    5, 4, 3, 2, 1, 5, 4, 3, 2, 1, 5, 4, 3, 2, 5, 4, 3, 2, 1, 5, 4, 3, 2, 1, 5, 4, 3, 2, 1, 5, 4, 3,
    2, 5, 4, 3, 2, 1, 5, 4, 3, 2, 1, 5, 4, 3, 2, 1, 5, 4, 3, 2, 1, 5, 4, 3, 2, 1, 5, 4, 2, 5, 3, 1,
];

pub const UEP_BITRATES: [u16; 64] = [
    32, 32, 32, 32, 32, 48, 48, 48, 48, 48, 56, 56, 56, 56, 64, 64, 64, 64, 64, 80, 80, 80, 80, 80,
    96, 96, 96, 96, 96, 112, 112, 112, 112, 128, 128, 128, 128, 128, 160, 160, 160, 160, 160, 192,
    192, 192, 192, 192, 224, 224, 224, 224, 224, 256, 256, 256, 256, 256, 320, 320, 320, 384, 384,
    384,
];

pub const EEP_A_SIZE_FACTORS: [u16; 4] = [12, 8, 6, 4];
pub const EEP_B_SIZE_FACTORS: [u16; 4] = [27, 21, 18, 15];

pub const LANGUAGES_0X00_TO_0X2B: [&str; 44] = [
    "unknown/not applicable",
    "Albanian",
    "Breton",
    "Catalan",
    "Croatian",
    "Welsh",
    "Czech",
    "Danish",
    "German",
    "English",
    "Spanish",
    "Esperanto",
    "Estonian",
    "Basque",
    "Faroese",
    "French",
    "Frisian",
    "Irish",
    "Gaelic",
    "Galician",
    "Icelandic",
    "Italian",
    "Sami",
    "Latin",
    "Latvian",
    "Luxembourgian",
    "Lithuanian",
    "Hungarian",
    "Maltese",
    "Dutch",
    "Norwegian",
    "Occitan",
    "Polish",
    "Portuguese",
    "Romanian",
    "Romansh",
    "Serbian",
    "Slovak",
    "Slovene",
    "Finnish",
    "Swedish",
    "Turkish",
    "Flemish",
    "Walloon",
];

pub const LANGUAGES_0X7F_DOWNTO_0X45: [&str; 59] = [
    "Amharic",
    "Arabic",
    "Armenian",
    "Assamese",
    "Azerbaijani",
    "Bambora",
    "Belorussian",
    "Bengali",
    "Bulgarian",
    "Burmese",
    "Chinese",
    "Chuvash",
    "Dari",
    "Fulani",
    "Georgian",
    "Greek",
    "Gujurati",
    "Gurani",
    "Hausa",
    "Hebrew",
    "Hindi",
    "Indonesian",
    "Japanese",
    "Kannada",
    "Kazakh",
    "Khmer",
    "Korean",
    "Laotian",
    "Macedonian",
    "Malagasay",
    "Malaysian",
    "Moldavian",
    "Marathi",
    "Ndebele",
    "Nepali",
    "Oriya",
    "Papiamento",
    "Persian",
    "Punjabi",
    "Pushtu",
    "Quechua",
    "Russian",
    "Rusyn",
    "Serbo-Croat",
    "Shona",
    "Sinhalese",
    "Somali",
    "Sranan Tongo",
    "Swahili",
    "Tadzhik",
    "Tamil",
    "Tatar",
    "Telugu",
    "Thai",
    "Ukranian",
    "Urdu",
    "Uzbek",
    "Vietnamese",
    "Zulu",
];

pub const PTYS_RDS_0X00_TO_0X1D: [&str; 30] = [
    "No programme type",
    "News",
    "Current Affairs",
    "Information",
    "Sport",
    "Education",
    "Drama",
    "Culture",
    "Science",
    "Varied",
    "Pop Music",
    "Rock Music",
    "Easy Listening Music",
    "Light Classical",
    "Serious Classical",
    "Other Music",
    "Weather/meteorology",
    "Finance/Business",
    "Children's programmes",
    "Social Affairs",
    "Religion",
    "Phone In",
    "Travel",
    "Leisure",
    "Jazz Music",
    "Country Music",
    "National Music",
    "Oldies Music",
    "Folk Music",
    "Documentary",
];

pub const PTYS_RBDS_0X00_TO_0X1D: [&str; 30] = [
    "No program type",
    "News",
    "Information",
    "Sports",
    "Talk",
    "Rock",
    "Classic Rock",
    "Adult Hits",
    "Soft Rock",
    "Top 40",
    "Country",
    "Oldies",
    "Soft",
    "Nostalgia",
    "Jazz",
    "Classical",
    "Rhythm and Blues",
    "Soft Rhythm and Blues",
    "Foreign Language",
    "Religious Music",
    "Religious Talk",
    "Personality",
    "Public",
    "College",
    "(rfu)",
    "(rfu)",
    "(rfu)",
    "(rfu)",
    "(rfu)",
    "Weather",
];

pub const ASU_TYPES_0_TO_10: [&str; 11] = [
    "Alarm",
    "Road Traffic flash",
    "Transport flash",
    "Warning/Service",
    "News flash",
    "Area weather flash",
    "Event announcement",
    "Special event",
    "Programme Information",
    "Sport report",
    "Financial report",
];

/// International Table Id 0x01: RDS PTY dictionary.
pub const INTER_TABLE_RDS: u8 = 0x01;
/// International Table Id 0x02: RBDS PTY dictionary.
pub const INTER_TABLE_RBDS: u8 = 0x02;

pub fn language_name(value: u8) -> String {
    if (0x00..=0x2B).contains(&value) {
        return LANGUAGES_0X00_TO_0X2B[value as usize].to_string();
    }
    if value == 0x40 {
        return "background sound/clean feed".to_string();
    }
    if (0x45..=0x7F).contains(&value) {
        return LANGUAGES_0X7F_DOWNTO_0X45[(0x7F - value) as usize].to_string();
    }
    format!("unknown ({value})")
}

pub fn pty_name(value: u8, inter_table_id: u8) -> String {
    match inter_table_id {
        INTER_TABLE_RDS => {
            if (value as usize) < PTYS_RDS_0X00_TO_0X1D.len() {
                PTYS_RDS_0X00_TO_0X1D[value as usize].to_string()
            } else {
                "(not used)".to_string()
            }
        }
        INTER_TABLE_RBDS => {
            if (value as usize) < PTYS_RBDS_0X00_TO_0X1D.len() {
                PTYS_RBDS_0X00_TO_0X1D[value as usize].to_string()
            } else {
                "(not used)".to_string()
            }
        }
        _ => "(unknown)".to_string(),
    }
}

pub fn asu_type_name(value: u8) -> String {
    if (value as usize) < ASU_TYPES_0_TO_10.len() {
        ASU_TYPES_0_TO_10[value as usize].to_string()
    } else {
        format!("unknown ({value})")
    }
}

pub fn inter_table_name(value: u8) -> &'static str {
    match value {
        INTER_TABLE_RDS => "RDS PTY",
        INTER_TABLE_RBDS => "RBDS PTY",
        _ => "unknown",
    }
}

pub fn lto_to_string(value: i8) -> String {
    let hours = value / 2;
    let minutes = if value % 2 != 0 { 30 } else { 0 };
    format!("{hours:+03}:{minutes:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_lengths_match_64_entries() {
        assert_eq!(UEP_SIZES.len(), 64);
        assert_eq!(UEP_PLS.len(), 64);
        assert_eq!(UEP_BITRATES.len(), 64);
    }

    #[test]
    fn language_lookup() {
        assert_eq!(language_name(0x09), "English");
        assert_eq!(language_name(0x40), "background sound/clean feed");
    }

    #[test]
    fn pty_lookup_depends_on_table() {
        assert_eq!(pty_name(0x01, INTER_TABLE_RDS), "News");
        assert_eq!(pty_name(0x01, INTER_TABLE_RBDS), "News");
        assert_eq!(pty_name(0x01, 0xFF), "(unknown)");
    }

    #[test]
    fn lto_formatting() {
        assert_eq!(lto_to_string(2), "+01:00");
        assert_eq!(lto_to_string(-3), "-01:30");
    }
}
