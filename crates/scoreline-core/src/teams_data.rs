// Built-in team tables: (full name, city, abbreviation).

pub(crate) const NFL: &[(&str, &str, &str)] = &[
    ("Arizona Cardinals", "Arizona", "ARI"),
    ("Atlanta Falcons", "Atlanta", "ATL"),
    ("Baltimore Ravens", "Baltimore", "BAL"),
    ("Buffalo Bills", "Buffalo", "BUF"),
    ("Carolina Panthers", "Carolina", "CAR"),
    ("Chicago Bears", "Chicago", "CHI"),
    ("Cincinnati Bengals", "Cincinnati", "CIN"),
    ("Cleveland Browns", "Cleveland", "CLE"),
    ("Dallas Cowboys", "Dallas", "DAL"),
    ("Denver Broncos", "Denver", "DEN"),
    ("Detroit Lions", "Detroit", "DET"),
    ("Green Bay Packers", "Green Bay", "GB"),
    ("Houston Texans", "Houston", "HOU"),
    ("Indianapolis Colts", "Indianapolis", "IND"),
    ("Jacksonville Jaguars", "Jacksonville", "JAX"),
    ("Kansas City Chiefs", "Kansas City", "KC"),
    ("Las Vegas Raiders", "Las Vegas", "LV"),
    ("Los Angeles Chargers", "Los Angeles", "LAC"),
    ("Los Angeles Rams", "Los Angeles", "LAR"),
    ("Miami Dolphins", "Miami", "MIA"),
    ("Minnesota Vikings", "Minnesota", "MIN"),
    ("New England Patriots", "New England", "NE"),
    ("New Orleans Saints", "New Orleans", "NO"),
    ("New York Giants", "New York", "NYG"),
    ("New York Jets", "New York", "NYJ"),
    ("Philadelphia Eagles", "Philadelphia", "PHI"),
    ("Pittsburgh Steelers", "Pittsburgh", "PIT"),
    ("San Francisco 49ers", "San Francisco", "SF"),
    ("Seattle Seahawks", "Seattle", "SEA"),
    ("Tampa Bay Buccaneers", "Tampa Bay", "TB"),
    ("Tennessee Titans", "Tennessee", "TEN"),
    ("Washington Commanders", "Washington", "WAS"),
];

pub(crate) const NBA: &[(&str, &str, &str)] = &[
    ("Atlanta Hawks", "Atlanta", "ATL"),
    ("Boston Celtics", "Boston", "BOS"),
    ("Brooklyn Nets", "Brooklyn", "BKN"),
    ("Charlotte Hornets", "Charlotte", "CHA"),
    ("Chicago Bulls", "Chicago", "CHI"),
    ("Cleveland Cavaliers", "Cleveland", "CLE"),
    ("Dallas Mavericks", "Dallas", "DAL"),
    ("Denver Nuggets", "Denver", "DEN"),
    ("Detroit Pistons", "Detroit", "DET"),
    ("Golden State Warriors", "Golden State", "GSW"),
    ("Houston Rockets", "Houston", "HOU"),
    ("Indiana Pacers", "Indiana", "IND"),
    ("Los Angeles Clippers", "Los Angeles", "LAC"),
    ("Los Angeles Lakers", "Los Angeles", "LAL"),
    ("Memphis Grizzlies", "Memphis", "MEM"),
    ("Miami Heat", "Miami", "MIA"),
    ("Milwaukee Bucks", "Milwaukee", "MIL"),
    ("Minnesota Timberwolves", "Minnesota", "MIN"),
    ("New Orleans Pelicans", "New Orleans", "NOP"),
    ("New York Knicks", "New York", "NYK"),
    ("Oklahoma City Thunder", "Oklahoma City", "OKC"),
    ("Orlando Magic", "Orlando", "ORL"),
    ("Philadelphia 76ers", "Philadelphia", "PHI"),
    ("Phoenix Suns", "Phoenix", "PHX"),
    ("Portland Trail Blazers", "Portland", "POR"),
    ("Sacramento Kings", "Sacramento", "SAC"),
    ("San Antonio Spurs", "San Antonio", "SAS"),
    ("Toronto Raptors", "Toronto", "TOR"),
    ("Utah Jazz", "Utah", "UTA"),
    ("Washington Wizards", "Washington", "WAS"),
];

pub(crate) const MLB: &[(&str, &str, &str)] = &[
    ("Arizona Diamondbacks", "Arizona", "ARI"),
    ("Atlanta Braves", "Atlanta", "ATL"),
    ("Baltimore Orioles", "Baltimore", "BAL"),
    ("Boston Red Sox", "Boston", "BOS"),
    ("Chicago Cubs", "Chicago", "CHC"),
    ("Chicago White Sox", "Chicago", "CWS"),
    ("Cincinnati Reds", "Cincinnati", "CIN"),
    ("Cleveland Guardians", "Cleveland", "CLE"),
    ("Colorado Rockies", "Colorado", "COL"),
    ("Detroit Tigers", "Detroit", "DET"),
    ("Houston Astros", "Houston", "HOU"),
    ("Kansas City Royals", "Kansas City", "KC"),
    ("Los Angeles Angels", "Los Angeles", "LAA"),
    ("Los Angeles Dodgers", "Los Angeles", "LAD"),
    ("Miami Marlins", "Miami", "MIA"),
    ("Milwaukee Brewers", "Milwaukee", "MIL"),
    ("Minnesota Twins", "Minnesota", "MIN"),
    ("New York Mets", "New York", "NYM"),
    ("New York Yankees", "New York", "NYY"),
    ("Athletics", "Sacramento", "ATH"),
    ("Philadelphia Phillies", "Philadelphia", "PHI"),
    ("Pittsburgh Pirates", "Pittsburgh", "PIT"),
    ("San Diego Padres", "San Diego", "SD"),
    ("San Francisco Giants", "San Francisco", "SF"),
    ("Seattle Mariners", "Seattle", "SEA"),
    ("St. Louis Cardinals", "St. Louis", "STL"),
    ("Tampa Bay Rays", "Tampa Bay", "TB"),
    ("Texas Rangers", "Texas", "TEX"),
    ("Toronto Blue Jays", "Toronto", "TOR"),
    ("Washington Nationals", "Washington", "WSH"),
];

pub(crate) const NHL: &[(&str, &str, &str)] = &[
    ("Anaheim Ducks", "Anaheim", "ANA"),
    ("Boston Bruins", "Boston", "BOS"),
    ("Buffalo Sabres", "Buffalo", "BUF"),
    ("Calgary Flames", "Calgary", "CGY"),
    ("Carolina Hurricanes", "Carolina", "CAR"),
    ("Chicago Blackhawks", "Chicago", "CHI"),
    ("Colorado Avalanche", "Colorado", "COL"),
    ("Columbus Blue Jackets", "Columbus", "CBJ"),
    ("Dallas Stars", "Dallas", "DAL"),
    ("Detroit Red Wings", "Detroit", "DET"),
    ("Edmonton Oilers", "Edmonton", "EDM"),
    ("Florida Panthers", "Florida", "FLA"),
    ("Los Angeles Kings", "Los Angeles", "LAK"),
    ("Minnesota Wild", "Minnesota", "MIN"),
    ("Montreal Canadiens", "Montreal", "MTL"),
    ("Nashville Predators", "Nashville", "NSH"),
    ("New Jersey Devils", "New Jersey", "NJD"),
    ("New York Islanders", "New York", "NYI"),
    ("New York Rangers", "New York", "NYR"),
    ("Ottawa Senators", "Ottawa", "OTT"),
    ("Philadelphia Flyers", "Philadelphia", "PHI"),
    ("Pittsburgh Penguins", "Pittsburgh", "PIT"),
    ("San Jose Sharks", "San Jose", "SJS"),
    ("Seattle Kraken", "Seattle", "SEA"),
    ("St. Louis Blues", "St. Louis", "STL"),
    ("Tampa Bay Lightning", "Tampa Bay", "TBL"),
    ("Toronto Maple Leafs", "Toronto", "TOR"),
    ("Utah Mammoth", "Utah", "UTA"),
    ("Vancouver Canucks", "Vancouver", "VAN"),
    ("Vegas Golden Knights", "Vegas", "VGK"),
    ("Washington Capitals", "Washington", "WSH"),
    ("Winnipeg Jets", "Winnipeg", "WPG"),
];
