//! Arabic club names mapped to the English search terms the provider indexes

const ARABIC_TEAM_NAMES: &[(&str, &str)] = &[
    // Premier League
    ("أرسنال", "Arsenal"),
    ("مانشستر سيتي", "Manchester City"),
    ("مانشستر يونايتد", "Manchester United"),
    ("ليفربول", "Liverpool"),
    ("تشيلسي", "Chelsea"),
    ("توتنهام", "Tottenham"),
    ("برايتون", "Brighton"),
    ("كريستال بالاس", "Crystal Palace"),
    ("فولهام", "Fulham"),
    ("برينتفورد", "Brentford"),
    ("إيفرتون", "Everton"),
    ("ليدز يونايتد", "Leeds United"),
    ("وست هام يونايتد", "West Ham United"),
    ("أستون فيلا", "Aston Villa"),
    ("نيوكاسل يونايتد", "Newcastle United"),
    ("ولفرهامبتون", "Wolverhampton"),
    ("نوتنغهام فورست", "Nottingham Forest"),
    ("ساوثهامبتون", "Southampton"),
    ("ليستر سيتي", "Leicester City"),
    ("بورنموث", "Bournemouth"),
    // La Liga
    ("ريال مدريد", "Real Madrid"),
    ("برشلونة", "Barcelona"),
    ("أتلتيكو مدريد", "Atletico Madrid"),
    ("إشبيلية", "Sevilla"),
    ("ريال سوسيداد", "Real Sociedad"),
    ("فياريال", "Villarreal"),
    ("ريال بيتيس", "Real Betis"),
    ("أتلتيك بلباو", "Athletic Bilbao"),
    ("فالنسيا", "Valencia"),
    ("سيلتا فيغو", "Celta Vigo"),
    // Serie A
    ("يوفنتوس", "Juventus"),
    ("إنتر ميلان", "Inter"),
    ("ميلان", "Milan"),
    ("نابولي", "Napoli"),
    ("روما", "Roma"),
    ("لاسيو", "Lazio"),
    ("فيورنتينا", "Fiorentina"),
    ("أتالانتا", "Atalanta"),
    // Bundesliga
    ("بايرن ميونخ", "Bayern Munich"),
    ("بوروسيا دورتموند", "Borussia Dortmund"),
    ("لايبزيغ", "RB Leipzig"),
    ("باير ليفركوزن", "Bayer Leverkusen"),
    ("أينتراخت فرانكفورت", "Eintracht Frankfurt"),
    // Ligue 1
    ("باريس سان جيرمان", "Paris Saint Germain"),
    ("أولمبيك مارسيليا", "Marseille"),
    ("أولمبيك ليون", "Lyon"),
    ("موناكو", "Monaco"),
    ("ليل", "Lille"),
    // Egyptian Premier League
    ("الأهلي", "Al Ahly"),
    ("الزمالك", "Zamalek"),
    ("بيراميدز", "Pyramids"),
    ("إنبي", "ENPPI"),
    ("سموحة", "Smouha"),
    ("طلائع الجيش", "Al Talaei El Gaish"),
    ("المقاولون العرب", "Al Mokawloon Al Arab"),
    ("سيراميكا كليوباترا", "Ceramica Cleopatra"),
    ("الاتحاد السكندري", "Al Ittihad Alexandria"),
    ("غزل المحلة", "Ghazl El Mahalla"),
    // Saudi Pro League
    ("الهلال", "Al Hilal"),
    ("النصر", "Al Nassr"),
    ("الاتحاد", "Al Ittihad"),
    ("الأهلي السعودي", "Al Ahli Saudi"),
    ("الشباب", "Al Shabab"),
    ("التعاون", "Al Taawoun"),
    ("الفيحاء", "Al Fayha"),
    ("الرائد", "Al Raed"),
    ("الفتح", "Al Fateh"),
    ("الوحده", "Al Wehda"),
    ("الطائي", "Al Taee"),
    ("الجبلين", "Al Jabalain"),
    ("الخليج", "Al Khaleej"),
    ("حطين", "Hattin"),
    ("الرجاء", "Al-Rajaa"),
    ("الدرعيه", "Al-Duhail"),
];

/// Looks up the English search term for an Arabic club name.
///
/// Only exact names match; anything else is searched as typed.
pub fn english_name(query: &str) -> Option<&'static str> {
    ARABIC_TEAM_NAMES
        .iter()
        .find(|(arabic, _)| *arabic == query)
        .map(|(_, english)| *english)
}

/// The term actually sent to the provider for a user query
pub fn search_term(query: &str) -> &str {
    english_name(query).unwrap_or(query)
}
